//! CLI entry point for sqlpilot.

pub mod repl;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::SqlPilotConfig;
use crate::error::SqlPilotError;
use crate::types::JsonObject;

/// Ask questions about a SQLite database in plain language.
#[derive(Parser, Debug)]
#[command(name = "sqlpilot", version, about = "Local text-to-SQL assistant")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every subcommand. They override the config file and environment.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ollama model name
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Ollama base URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// SQLite database passed to the tool server
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Tool-call round trips allowed per question
    #[arg(long, global = true)]
    pub max_round_trips: Option<usize>,

    /// Log filter (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

impl GlobalArgs {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut SqlPilotConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.ollama_url = url.clone();
        }
        if let Some(db_path) = &self.db_path {
            config.db_path = Some(db_path.clone());
        }
        if let Some(limit) = self.max_round_trips {
            config.max_round_trips = limit;
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question and exit
    Ask(AskArgs),
    /// Interactive session
    Chat(ChatArgs),
    /// List the tools the tool server offers
    Tools,
    /// Call a tool directly, bypassing the model
    Call(CallArgs),
}

/// Arguments for `sqlpilot ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question (multiple words are joined)
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,
}

impl AskArgs {
    pub fn question(&self) -> String {
        self.question.join(" ")
    }
}

/// Arguments for `sqlpilot chat`.
#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Carry the conversation across questions
    #[arg(long)]
    pub keep_history: bool,

    /// Write the conversation as JSON after every answer
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Continue a conversation saved with --transcript (implies --keep-history)
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

/// Arguments for `sqlpilot call`.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name
    pub tool: String,

    /// Arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

impl CallArgs {
    pub fn arguments(&self) -> Result<JsonObject, SqlPilotError> {
        match serde_json::from_str::<serde_json::Value>(&self.args)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(SqlPilotError::InvalidArgument(format!(
                "--args must be a JSON object, got {other}"
            ))),
        }
    }
}
