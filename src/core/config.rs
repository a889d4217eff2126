use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::constants::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Optional overrides for the classification call; unset fields fall back to
/// the defaults in [`crate::core::constants`].
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClassifierOverrides {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub history_window: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenAI-compatible API base URL.
    pub base_url: Option<String>,
    /// Model id used for the classification call.
    pub model: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub classifier: ClassifierOverrides,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "learnloop")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        let var = self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        env::var(var).ok().filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.base_url.is_none());
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            base_url: Some("http://localhost:11434/v1".to_string()),
            model: Some("llama3.1".to_string()),
            api_key_env: Some("LOCAL_API_KEY".to_string()),
            classifier: ClassifierOverrides {
                temperature: Some(0.2),
                max_tokens: Some(200),
                history_window: None,
            },
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.base_url(), "http://localhost:11434/v1");
        assert_eq!(loaded.model(), "llama3.1");
        assert_eq!(loaded.classifier.temperature, Some(0.2));
        assert_eq!(loaded.classifier.max_tokens, Some(200));
    }

    #[test]
    fn classifier_section_is_optional() {
        let config: Config = toml::from_str("model = \"gpt-4o-mini\"").unwrap();
        assert!(config.classifier.temperature.is_none());
    }
}
