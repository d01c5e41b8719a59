//! Interactive session: one orchestrator, one running conversation.

use std::path::Path;

use tracing::debug;

use super::conversation::Conversation;
use crate::agent_loop::Orchestrator;
use crate::error::SqlPilotError;
use crate::tools::{DirectCommand, ToolOutput};
use crate::types::{FinalAnswer, JsonObject};
use crate::util::timeout::with_timeout;

/// Wraps an [`Orchestrator`] with the conversation a REPL carries between
/// questions.
///
/// With `keep_history` off every question starts from an empty conversation;
/// the previous exchange stays readable until the next question is asked.
pub struct Session {
    orchestrator: Orchestrator,
    conversation: Conversation,
    keep_history: bool,
}

impl Session {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            conversation: Conversation::new(),
            keep_history: false,
        }
    }

    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    /// Continue from a previously saved conversation. Implies `keep_history`.
    pub fn resume(mut self, conversation: Conversation) -> Result<Self, SqlPilotError> {
        if let Some(call) = conversation.outstanding_call() {
            return Err(SqlPilotError::InvalidState(format!(
                "saved conversation ends with unanswered tool call '{}'",
                call.id
            )));
        }
        self.conversation = conversation;
        self.keep_history = true;
        Ok(self)
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn keeps_history(&self) -> bool {
        self.keep_history
    }

    /// Answer a natural-language question.
    ///
    /// A question that fails still gets a closing turn, so the next question
    /// does not follow an unanswered one.
    pub async fn ask(&mut self, question: &str) -> Result<FinalAnswer, SqlPilotError> {
        if !self.keep_history {
            self.conversation.clear();
        }
        let result = self
            .orchestrator
            .answer(question, &mut self.conversation)
            .await;

        if let Err(err) = &result {
            if self.conversation.outstanding_call().is_none() {
                self.conversation.push_final(FinalAnswer::failed(err))?;
            }
        }
        result
    }

    /// Run a direct command, bypassing the model.
    pub async fn run_direct(&self, command: &DirectCommand) -> Result<ToolOutput, SqlPilotError> {
        self.call(command.tool_name(), command.arguments()).await
    }

    /// Call a catalog tool by name with caller-supplied arguments.
    pub async fn call(
        &self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolOutput, SqlPilotError> {
        let catalog = self.orchestrator.catalog();
        if !catalog.contains(name) {
            return Err(SqlPilotError::UnknownTool {
                name: name.to_string(),
                available: catalog.names().join(", "),
            });
        }
        debug!(tool = name, "direct tool call");
        with_timeout(
            self.orchestrator.limits().tool_timeout,
            self.orchestrator.tool_server().call_tool(name, arguments),
        )
        .await
    }

    pub fn reset(&mut self) {
        self.conversation.clear();
    }

    /// Write the conversation transcript as JSON.
    pub fn save(&self, path: &Path) -> Result<(), SqlPilotError> {
        self.conversation.save(path)
    }
}
