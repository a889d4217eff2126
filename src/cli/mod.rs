//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

use std::error::Error;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::classifier::invoker::HttpModelInvoker;
use crate::classifier::{classify, ModelInvoker, ModelSettings};
use crate::core::config::Config;
use crate::core::message::Message;
use crate::orchestrator::ResponsePath;
use crate::tools::{MessageStreamParser, ToolExecutionTracker};

#[derive(Parser)]
#[command(name = "learnloop")]
#[command(about = "Query-complexity routing and tool progress for a chat front end")]
#[command(
    long_about = "Learnloop decides whether a chat query needs a simple direct answer or a \
multi-step learning loop with external tools, and reconstructs live tool \
progress from a conversation log.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    API key for the classification endpoint (or the variable\n\
                    named by api_key_env in the config file)\n\
  RUST_LOG          Diagnostic filter, e.g. RUST_LOG=learnloop=debug"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a query as SIMPLE or COMPLEX and print the chosen path
    Classify {
        /// The user query to classify
        message: String,
        /// Model id, overriding the configured default
        #[arg(short, long)]
        model: Option<String>,
        /// API base URL, overriding the configured default
        #[arg(short, long)]
        base_url: Option<String>,
        /// Skip the model stage; decide from the heuristics alone
        #[arg(long)]
        offline: bool,
    },
    /// Replay a JSON conversation log and print tool-execution state
    Replay {
        /// Path to a JSON array of {"role", "content"} messages
        file: PathBuf,
        /// Print records as JSON instead of summary lines
        #[arg(long)]
        json: bool,
    },
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Commands::Classify {
            message,
            model,
            base_url,
            offline,
        } => classify_command(&message, model, base_url, offline).await,
        Commands::Replay { file, json } => replay_command(&file, json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Invoker used by `--offline`: always fails, which routes classification
/// through the deterministic stages only.
struct OfflineInvoker;

#[async_trait]
impl ModelInvoker for OfflineInvoker {
    async fn invoke(&self, _prompt: &str, _settings: &ModelSettings) -> Result<String, String> {
        Err("offline mode".to_string())
    }
}

async fn classify_command(
    message: &str,
    model: Option<String>,
    base_url: Option<String>,
    offline: bool,
) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let settings = ModelSettings::from_config(&config);

    let decision = if offline {
        classify(message, &[], &OfflineInvoker, &settings).await
    } else {
        let invoker = HttpModelInvoker::new(
            base_url.as_deref().unwrap_or(config.base_url()),
            config.api_key().unwrap_or_default(),
            model.as_deref().unwrap_or(config.model()),
        );
        classify(message, &[], &invoker, &settings).await
    };

    let path = match ResponsePath::from(&decision) {
        ResponsePath::Direct => "direct answer",
        ResponsePath::LearningLoop => "learning loop",
    };

    println!("classification: {:?}", decision.classification);
    println!("confidence:     {:.2}", decision.confidence);
    println!("reasoning:      {}", decision.reasoning);
    println!("path:           {path}");
    Ok(())
}

fn replay_command(file: &PathBuf, as_json: bool) -> Result<(), Box<dyn Error>> {
    let contents = std::fs::read_to_string(file)?;
    let messages: Vec<Message> = serde_json::from_str(&contents)?;

    let mut tracker = ToolExecutionTracker::new();
    MessageStreamParser::replay(&messages, &mut tracker);

    if as_json {
        println!("{}", serde_json::to_string_pretty(tracker.records())?);
        return Ok(());
    }

    if tracker.records().is_empty() {
        println!("no tool activity in log");
    }
    for record in tracker.records() {
        println!("{}", record.summary());
    }
    println!(
        "active: {}",
        if tracker.is_active() { "yes" } else { "no" }
    );
    Ok(())
}
