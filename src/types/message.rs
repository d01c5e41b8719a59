//! Tool-call and answer types exchanged between the loop and its collaborators.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// JSON object used for tool arguments.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: JsonObject,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: JsonObject) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// The outcome of one tool call, as recorded in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: message.into(),
            is_error: true,
        }
    }
}

/// How a final answer came about.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnswerKind {
    /// The model answered.
    #[default]
    Model,
    /// The model kept producing unparseable output; the text describes the failure.
    MalformedResponse,
    /// The question ended with an error; recorded so kept history stays paired.
    Failed,
}

/// Terminal turn for one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalAnswer {
    pub text: String,
    #[serde(default)]
    pub kind: AnswerKind,
}

impl FinalAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Model,
        }
    }

    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self {
            text: format!(
                "The model did not produce a usable response ({detail}). \
                 Try rephrasing the question or run the query directly with 'read_query <sql>'."
            ),
            kind: AnswerKind::MalformedResponse,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            text: format!("The question could not be answered: {error}"),
            kind: AnswerKind::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind != AnswerKind::Model
    }
}

/// What the model endpoint returned for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    ToolCall(ToolCallRequest),
    Final(FinalAnswer),
}

impl ModelReply {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self::Final(FinalAnswer::new(text))
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        Self::ToolCall(ToolCallRequest::new(name, arguments))
    }
}
