//! Convenience re-exports for common use.

pub use crate::agent::{Conversation, Session};
pub use crate::agent_loop::{LoopEvent, LoopLimits, Orchestrator};
pub use crate::config::SqlPilotConfig;
pub use crate::error::{Result, SqlPilotError};
pub use crate::provider::{ModelEndpoint, OllamaEndpoint};
pub use crate::tools::{ToolCatalog, ToolOutput, ToolSchema, ToolServer};
pub use crate::types::{FinalAnswer, ModelReply, ToolCallRequest, ToolCallResult};

#[cfg(feature = "mcp")]
pub use crate::mcp::MCPToolServer;
