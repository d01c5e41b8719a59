//! Append-only conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlPilotError};
use crate::types::{FinalAnswer, ToolCallRequest, ToolCallResult};

/// One entry in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TurnKind,
}

/// What a turn holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnKind {
    User { text: String },
    ToolCall(ToolCallRequest),
    ToolResult(ToolCallResult),
    /// Model output that was neither a tool call nor an answer.
    ModelOutput { text: String },
    /// Sent to the model after it produced output that could not be parsed.
    Correction { text: String },
    Final(FinalAnswer),
}

/// Where a conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    AwaitingModel,
    AwaitingToolResult,
    Answered,
}

/// Ordered turn history.
///
/// At most one tool call is outstanding at any time: a new tool call can only
/// be appended once the previous one has its result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn state(&self) -> ConversationState {
        match self.turns.last().map(|t| &t.kind) {
            None => ConversationState::Idle,
            Some(TurnKind::ToolCall(_)) => ConversationState::AwaitingToolResult,
            Some(TurnKind::Final(_)) => ConversationState::Answered,
            Some(_) => ConversationState::AwaitingModel,
        }
    }

    /// The tool call still waiting for its result.
    pub fn outstanding_call(&self) -> Option<&ToolCallRequest> {
        match self.turns.last().map(|t| &t.kind) {
            Some(TurnKind::ToolCall(call)) => Some(call),
            _ => None,
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_no_outstanding_call("user question")?;
        self.push(TurnKind::User { text: text.into() });
        Ok(())
    }

    pub fn push_tool_call(&mut self, call: ToolCallRequest) -> Result<()> {
        self.ensure_no_outstanding_call("tool call")?;
        self.push(TurnKind::ToolCall(call));
        Ok(())
    }

    pub fn push_tool_result(&mut self, result: ToolCallResult) -> Result<()> {
        match self.outstanding_call() {
            Some(call) if call.id == result.call_id => {
                self.push(TurnKind::ToolResult(result));
                Ok(())
            }
            Some(call) => Err(SqlPilotError::InvalidState(format!(
                "tool result for '{}' does not match outstanding call '{}'",
                result.call_id, call.id
            ))),
            None => Err(SqlPilotError::InvalidState(format!(
                "tool result for '{}' without an outstanding call",
                result.call_id
            ))),
        }
    }

    pub fn push_model_output(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_no_outstanding_call("model output")?;
        self.push(TurnKind::ModelOutput { text: text.into() });
        Ok(())
    }

    pub fn push_correction(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_no_outstanding_call("correction")?;
        self.push(TurnKind::Correction { text: text.into() });
        Ok(())
    }

    pub fn push_final(&mut self, answer: FinalAnswer) -> Result<()> {
        self.ensure_no_outstanding_call("final answer")?;
        self.push(TurnKind::Final(answer));
        Ok(())
    }

    /// Tool calls in the order they were issued.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRequest> {
        self.turns.iter().filter_map(|t| match &t.kind {
            TurnKind::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    pub fn tool_results(&self) -> impl Iterator<Item = &ToolCallResult> {
        self.turns.iter().filter_map(|t| match &t.kind {
            TurnKind::ToolResult(result) => Some(result),
            _ => None,
        })
    }

    /// The most recent final answer.
    pub fn last_answer(&self) -> Option<&FinalAnswer> {
        self.turns.iter().rev().find_map(|t| match &t.kind {
            TurnKind::Final(answer) => Some(answer),
            _ => None,
        })
    }

    /// Load a transcript previously written with [`Conversation::save`].
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the conversation as pretty-printed JSON.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn ensure_no_outstanding_call(&self, what: &str) -> Result<()> {
        match self.outstanding_call() {
            Some(call) => Err(SqlPilotError::InvalidState(format!(
                "cannot append {what} while tool call '{}' ({}) is outstanding",
                call.id, call.name
            ))),
            None => Ok(()),
        }
    }

    fn push(&mut self, kind: TurnKind) {
        self.turns.push(Turn {
            at: Utc::now(),
            kind,
        });
    }
}
