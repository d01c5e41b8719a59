//! Error types for sqlpilot.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::agent::conversation::Conversation;

/// Primary error type for all sqlpilot operations.
#[derive(Error, Debug)]
pub enum SqlPilotError {
    /// The model endpoint could not be reached, answered with an HTTP error,
    /// or timed out.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The tool server is unreachable, faulted at the protocol level, or the
    /// tool itself reported an error.
    #[error("Tool server error: {tool_name}: {message}")]
    ToolServer { tool_name: String, message: String },

    #[error("Unknown tool '{name}' (available: {available})")]
    UnknownTool { name: String, available: String },

    /// The model replied with something that is neither a tool call nor an
    /// answer. `raw` is the reply as the model produced it.
    #[error("Malformed model response: {detail}")]
    MalformedResponse { detail: String, raw: String },

    /// The round-trip budget ran out. Carries the conversation as it stood.
    #[error("Exceeded maximum of {limit} tool round trips")]
    MaxIterationsExceeded {
        limit: usize,
        conversation: Box<Conversation>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SqlPilotError {
    pub fn tool_server(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolServer {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedResponse {
            detail: detail.into(),
            raw: raw.into(),
        }
    }

    /// Attach the model's raw reply to a malformed-response error that lacks one.
    pub fn with_raw_output(self, output: &str) -> Self {
        match self {
            Self::MalformedResponse { detail, raw } if raw.is_empty() => Self::MalformedResponse {
                detail,
                raw: output.to_string(),
            },
            other => other,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelUnavailable(_) => ErrorCategory::Model,
            Self::ToolServer { .. } => ErrorCategory::ToolServer,
            Self::UnknownTool { .. } | Self::MalformedResponse { .. } => ErrorCategory::Protocol,
            Self::MaxIterationsExceeded { .. } => ErrorCategory::Limit,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) => ErrorCategory::Io,
            Self::InvalidState(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error ends the current question.
    ///
    /// Tool server errors and malformed responses are fed back into the
    /// conversation by the loop; everything else is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::ToolServer { .. } | Self::MalformedResponse { .. } | Self::Timeout(_)
        )
    }

    /// The conversation attached to the error, if any.
    pub fn partial_conversation(&self) -> Option<&Conversation> {
        match self {
            Self::MaxIterationsExceeded { conversation, .. } => Some(conversation),
            _ => None,
        }
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Model => RecoverySuggestion::CheckModelServer,
            ErrorCategory::ToolServer => RecoverySuggestion::CheckToolServer,
            ErrorCategory::Protocol => RecoverySuggestion::RephraseQuestion,
            ErrorCategory::Limit => RecoverySuggestion::IncreaseLimit,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            _ => RecoverySuggestion::None,
        }
    }
}

impl From<toml::de::Error> for SqlPilotError {
    fn from(error: toml::de::Error) -> Self {
        Self::Configuration(format!("invalid config file: {error}"))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SqlPilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_server_errors_are_recoverable_inside_the_loop() {
        let err = SqlPilotError::tool_server("read_query", "no such table: foo");
        assert!(!err.is_terminal());
        assert_eq!(err.category(), ErrorCategory::ToolServer);
        assert_eq!(
            err.to_string(),
            "Tool server error: read_query: no such table: foo"
        );
    }

    #[test]
    fn model_unavailable_is_terminal() {
        let err = SqlPilotError::ModelUnavailable("connection refused".into());
        assert!(err.is_terminal());
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::CheckModelServer);
    }

    #[test]
    fn max_iterations_exposes_partial_conversation() {
        let mut conversation = Conversation::new();
        conversation.push_user("how many rows?").unwrap();
        let err = SqlPilotError::MaxIterationsExceeded {
            limit: 3,
            conversation: Box::new(conversation),
        };

        assert_eq!(err.category(), ErrorCategory::Limit);
        assert_eq!(err.partial_conversation().map(Conversation::len), Some(1));
        assert_eq!(err.to_string(), "Exceeded maximum of 3 tool round trips");
    }

    #[test]
    fn raw_output_is_attached_once() {
        let err = SqlPilotError::malformed("empty tool call block", "")
            .with_raw_output("```json\n```")
            .with_raw_output("ignored");
        match err {
            SqlPilotError::MalformedResponse { detail, raw } => {
                assert_eq!(detail, "empty tool call block");
                assert_eq!(raw, "```json\n```");
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
        assert!(!SqlPilotError::malformed("x", "y").is_terminal());
    }

    #[test]
    fn toml_errors_become_configuration_errors() {
        let toml_err = toml::from_str::<toml::Value>("model = ").unwrap_err();
        let err: SqlPilotError = toml_err.into();
        assert!(matches!(err, SqlPilotError::Configuration(msg) if msg.contains("invalid config")));
    }
}
