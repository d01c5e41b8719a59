//! Ollama `/api/chat` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::agent::conversation::{Conversation, TurnKind};
use crate::config::SqlPilotConfig;
use crate::error::SqlPilotError;
use crate::types::{GenerationSettings, ModelReply};

use super::http::{build_client, request_error, status_to_error};
use super::parse::{parse_reply, RawToolCall};
use super::{ModelEndpoint, ModelRequest};

pub struct OllamaEndpoint {
    client: reqwest::Client,
    base_url: String,
    model: String,
    settings: GenerationSettings,
}

impl OllamaEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        settings: GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, SqlPilotError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            settings,
        })
    }

    pub fn from_config(config: &SqlPilotConfig) -> Result<Self, SqlPilotError> {
        Self::new(
            config.ollama_url.clone(),
            config.model.clone(),
            config.generation.clone(),
            config.model_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Names of the models the server has pulled (`/api/tags`).
    pub async fn available_models(&self) -> Result<Vec<String>, SqlPilotError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body, &self.model));
        }

        let tags: OllamaTags = resp
            .json()
            .await
            .map_err(|e| SqlPilotError::ModelUnavailable(format!("invalid /api/tags body: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether the configured model is available on the server.
    ///
    /// `llama3.1` matches a pulled `llama3.1:latest`.
    pub async fn has_model(&self) -> Result<bool, SqlPilotError> {
        let wanted = &self.model;
        Ok(self.available_models().await?.iter().any(|name| {
            name == wanted || name.strip_suffix(":latest") == Some(wanted.as_str())
        }))
    }

    fn build_request_body(&self, request: &ModelRequest<'_>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": conversation_to_messages(request.system_prompt, request.conversation),
            "stream": false,
            "options": self.settings.to_options(),
        });

        if !request.catalog.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("tools".into(), request.catalog.to_ollama().into());
            }
        }

        body
    }
}

#[async_trait]
impl ModelEndpoint for OllamaEndpoint {
    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }

    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelReply, SqlPilotError> {
        let body = self.build_request_body(&request);
        let url = format!("{}/api/chat", self.base_url);

        debug!(
            model = %self.model,
            turns = request.conversation.len(),
            tools = request.catalog.len(),
            "ollama chat request"
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text, &self.model));
        }

        let raw = resp.text().await.map_err(|e| request_error(&url, e))?;
        let data: OllamaChatResponse = serde_json::from_str(&raw).map_err(|e| {
            SqlPilotError::malformed(format!("unexpected /api/chat body: {e}"), raw.trim())
        })?;

        let native_calls: Vec<RawToolCall> = data
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| RawToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        if native_calls.len() > 1 {
            tracing::warn!(
                count = native_calls.len(),
                "model requested several tool calls at once; only the first is executed"
            );
        }

        debug!(
            done_reason = data.done_reason.as_deref().unwrap_or("unknown"),
            native_calls = native_calls.len(),
            "ollama chat response"
        );

        parse_reply(&data.message.content, native_calls)
    }
}

fn conversation_to_messages(system_prompt: &str, conversation: &Conversation) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
    }

    let mut last_tool_name = String::new();
    for turn in conversation.turns() {
        let message = match &turn.kind {
            TurnKind::User { text } | TurnKind::Correction { text } => {
                serde_json::json!({ "role": "user", "content": text })
            }
            TurnKind::ModelOutput { text } => {
                serde_json::json!({ "role": "assistant", "content": text })
            }
            TurnKind::ToolCall(call) => {
                last_tool_name = call.name.clone();
                serde_json::json!({
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    }],
                })
            }
            TurnKind::ToolResult(result) => {
                let content = if result.is_error {
                    format!("Error: {}", result.content)
                } else {
                    result.content.clone()
                };
                serde_json::json!({
                    "role": "tool",
                    "tool_name": last_tool_name,
                    "content": content,
                })
            }
            TurnKind::Final(answer) => {
                serde_json::json!({ "role": "assistant", "content": answer.text })
            }
        };
        messages.push(message);
    }
    messages
}

// Ollama API response types (internal)

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    #[serde(default)]
    id: Option<String>,
    function: OllamaFunction,
}

#[derive(Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Deserialize)]
struct OllamaModelTag {
    name: String,
}
