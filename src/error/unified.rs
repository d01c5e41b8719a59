//! Error classification and recovery hints.

use strum::Display;

/// Broad error category, used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Model,
    ToolServer,
    Protocol,
    Limit,
    Timeout,
    Configuration,
    Serialization,
    Io,
    Internal,
}

/// Suggested recovery action for the person at the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check that `ollama serve` is running and the model has been pulled.
    CheckModelServer,
    /// Check the MCP server command and database path.
    CheckToolServer,
    /// Rephrase the question or query the database directly.
    RephraseQuestion,
    /// Raise the round-trip limit.
    IncreaseLimit,
    IncreaseTimeout,
    CheckConfiguration,
    None,
}
