//! Model endpoint trait and the Ollama implementation.

pub mod http;
pub mod ollama;
pub mod parse;

use async_trait::async_trait;

use crate::agent::conversation::Conversation;
use crate::error::SqlPilotError;
use crate::tools::ToolCatalog;
use crate::types::ModelReply;

pub use ollama::OllamaEndpoint;

/// Everything the model sees for one call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system_prompt: &'a str,
    pub conversation: &'a Conversation,
    pub catalog: &'a ToolCatalog,
}

/// A language-model inference service that can request tool calls.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    /// Identifier used in logs, e.g. `ollama:llama3.1`.
    fn describe(&self) -> String;

    /// Submit the conversation and tool catalog; get back a tool call or an answer.
    ///
    /// Unreachable endpoints and HTTP failures are [`SqlPilotError::ModelUnavailable`];
    /// unparseable output is [`SqlPilotError::MalformedResponse`].
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelReply, SqlPilotError>;
}
