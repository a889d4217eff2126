//! Shared constants used across the application

/// Sampling temperature for the classification call. Kept low so repeated
/// classifications of the same query stay repeatable.
pub const CLASSIFIER_TEMPERATURE: f32 = 0.1;

/// Token budget for the classification call; the expected JSON reply is tiny.
pub const CLASSIFIER_MAX_TOKENS: u32 = 150;

/// Number of prior turns included in the classification prompt.
pub const HISTORY_WINDOW: usize = 3;

/// Word count above which the fallback heuristic treats a query as complex.
pub const FALLBACK_WORD_LIMIT: usize = 30;

/// Confidence reported by the fallback heuristic.
pub const FALLBACK_CONFIDENCE: f32 = 0.6;

/// Confidence reported when the safety net overrides a model `SIMPLE`.
pub const SAFETY_NET_CONFIDENCE: f32 = 0.8;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
