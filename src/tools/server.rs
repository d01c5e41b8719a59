//! Tool server abstraction: where tool calls are actually executed.

use async_trait::async_trait;

use super::catalog::ToolSchema;
use crate::error::SqlPilotError;
use crate::types::JsonObject;

/// Payload returned by a tool server for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    /// The tool ran but reported a failure (e.g. a SQL error).
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A process exposing callable tools (e.g. an MCP server).
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// List the tools this server exposes.
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, SqlPilotError>;

    /// Execute a tool by name. Protocol or transport faults are returned as
    /// [`SqlPilotError::ToolServer`]; tool-level failures as an error output.
    async fn call_tool(&self, name: &str, arguments: JsonObject)
        -> Result<ToolOutput, SqlPilotError>;
}
