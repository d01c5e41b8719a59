//! The orchestration loop: model call, tool call, repeat until answered.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::agent::conversation::Conversation;
use crate::config::{SqlPilotConfig, CORRECTIVE_PROMPT};
use crate::error::SqlPilotError;
use crate::provider::{ModelEndpoint, ModelRequest};
use crate::tools::{ToolCatalog, ToolServer};
use crate::types::{FinalAnswer, ModelReply, ToolCallRequest, ToolCallResult};
use crate::util::timeout::with_timeout;

use super::events::LoopEvent;

/// Callback receiving loop events.
pub type LoopEventSink = Arc<dyn Fn(&LoopEvent) + Send + Sync>;

/// Bounds applied to every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    /// Tool-call round trips allowed per question.
    pub max_round_trips: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self::from(&SqlPilotConfig::default())
    }
}

impl From<&SqlPilotConfig> for LoopLimits {
    fn from(config: &SqlPilotConfig) -> Self {
        Self {
            max_round_trips: config.max_round_trips,
            model_timeout: config.model_timeout,
            tool_timeout: config.tool_timeout,
        }
    }
}

/// Mediates between a model endpoint and a tool server.
///
/// Strictly sequential: one outbound call at a time, one outstanding tool
/// call per conversation.
pub struct Orchestrator {
    model: Arc<dyn ModelEndpoint>,
    tools: Arc<dyn ToolServer>,
    catalog: ToolCatalog,
    system_prompt: String,
    limits: LoopLimits,
    event_sink: Option<LoopEventSink>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelEndpoint>,
        tools: Arc<dyn ToolServer>,
        catalog: ToolCatalog,
    ) -> Self {
        Self {
            model,
            tools,
            catalog,
            system_prompt: String::new(),
            limits: LoopLimits::default(),
            event_sink: None,
        }
    }

    /// Build an orchestrator whose catalog is whatever the tool server lists.
    pub async fn discover(
        model: Arc<dyn ModelEndpoint>,
        tools: Arc<dyn ToolServer>,
    ) -> Result<Self, SqlPilotError> {
        let catalog = ToolCatalog::new(tools.list_tools().await?);
        debug!(tools = ?catalog.names(), "discovered tool catalog");
        Ok(Self::new(model, tools, catalog))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Apply the system prompt and limits from a resolved configuration.
    pub fn with_config(self, config: &SqlPilotConfig) -> Self {
        self.with_system_prompt(config.system_prompt.clone())
            .with_limits(LoopLimits::from(config))
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_event_sink(mut self, sink: LoopEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    pub fn tool_server(&self) -> &Arc<dyn ToolServer> {
        &self.tools
    }

    /// Drive one question to a final answer, appending every turn to `conversation`.
    pub async fn answer(
        &self,
        question: &str,
        conversation: &mut Conversation,
    ) -> Result<FinalAnswer, SqlPilotError> {
        let result = self.run(question, conversation).await;
        match &result {
            Ok(answer) => info!(
                round_trips = conversation.tool_calls().count(),
                failed = answer.is_failure(),
                "question answered"
            ),
            Err(err) => {
                warn!(error = %err, "question failed");
                self.emit(LoopEvent::Failed {
                    error: err.to_string(),
                });
            }
        }
        result
    }

    async fn run(
        &self,
        question: &str,
        conversation: &mut Conversation,
    ) -> Result<FinalAnswer, SqlPilotError> {
        conversation.push_user(question)?;
        self.emit(LoopEvent::QuestionReceived {
            question: question.to_string(),
        });

        let mut round_trips = 0usize;
        let mut awaiting_correction = false;

        loop {
            let call = match self.call_model(conversation).await {
                Ok(ModelReply::Final(answer)) => {
                    conversation.push_final(answer.clone())?;
                    self.emit(LoopEvent::Answered {
                        answer: answer.clone(),
                        round_trips,
                    });
                    return Ok(answer);
                }
                Ok(ModelReply::ToolCall(call)) => call,
                Err(SqlPilotError::MalformedResponse { detail, raw }) if !awaiting_correction => {
                    warn!(%detail, "malformed model response; retrying with a corrective prompt");
                    self.emit(LoopEvent::CorrectiveRetry {
                        detail: detail.clone(),
                    });
                    record_model_output(conversation, &raw)?;
                    conversation.push_correction(CORRECTIVE_PROMPT)?;
                    awaiting_correction = true;
                    continue;
                }
                Err(SqlPilotError::MalformedResponse { detail, raw }) => {
                    warn!(%detail, "model response still malformed after correction");
                    record_model_output(conversation, &raw)?;
                    let answer = FinalAnswer::malformed(&detail);
                    conversation.push_final(answer.clone())?;
                    self.emit(LoopEvent::Answered {
                        answer: answer.clone(),
                        round_trips,
                    });
                    return Ok(answer);
                }
                Err(err) => return Err(err),
            };
            awaiting_correction = false;

            if !self.catalog.contains(&call.name) {
                return Err(SqlPilotError::UnknownTool {
                    name: call.name,
                    available: self.catalog.names().join(", "),
                });
            }

            if round_trips >= self.limits.max_round_trips {
                return Err(SqlPilotError::MaxIterationsExceeded {
                    limit: self.limits.max_round_trips,
                    conversation: Box::new(conversation.clone()),
                });
            }
            round_trips += 1;

            conversation.push_tool_call(call.clone())?;
            self.emit(LoopEvent::ToolCallStarted {
                call: call.clone(),
                round_trip: round_trips,
            });

            let result = self.call_tool(&call).await;
            self.emit(LoopEvent::ToolResult {
                tool_name: call.name.clone(),
                result: result.clone(),
            });
            conversation.push_tool_result(result)?;
        }
    }

    async fn call_model(&self, conversation: &Conversation) -> Result<ModelReply, SqlPilotError> {
        let request = ModelRequest {
            system_prompt: &self.system_prompt,
            conversation,
            catalog: &self.catalog,
        };

        debug!(model = %self.model.describe(), turns = conversation.len(), "calling model");
        with_timeout(self.limits.model_timeout, self.model.respond(request))
            .await
            .map_err(|err| match err {
                SqlPilotError::Timeout(ms) => SqlPilotError::ModelUnavailable(format!(
                    "{} did not respond within {ms}ms",
                    self.model.describe()
                )),
                other => other,
            })
    }

    /// Execute one tool call. Every failure becomes an error-flagged result.
    async fn call_tool(&self, call: &ToolCallRequest) -> ToolCallResult {
        debug!(tool = %call.name, arguments = %serde_json::Value::Object(call.arguments.clone()), "calling tool");

        let outcome = with_timeout(
            self.limits.tool_timeout,
            self.tools.call_tool(&call.name, call.arguments.clone()),
        )
        .await;

        match outcome {
            Ok(output) if output.is_error => {
                warn!(tool = %call.name, error = %output.text, "tool reported an error");
                ToolCallResult::error(&call.id, output.text)
            }
            Ok(output) => ToolCallResult::success(&call.id, output.text),
            Err(SqlPilotError::Timeout(ms)) => {
                let err = SqlPilotError::tool_server(
                    &call.name,
                    format!("no result within {ms}ms"),
                );
                warn!(error = %err, "tool call timed out");
                ToolCallResult::error(&call.id, err.to_string())
            }
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool server call failed");
                ToolCallResult::error(&call.id, err.to_string())
            }
        }
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(sink) = &self.event_sink {
            sink(&event);
        }
    }
}

/// Keep an unusable reply in the history so the corrective prompt refers to
/// something the model can see.
fn record_model_output(conversation: &mut Conversation, raw: &str) -> Result<(), SqlPilotError> {
    if raw.trim().is_empty() {
        return Ok(());
    }
    conversation.push_model_output(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_config() {
        let config = SqlPilotConfig {
            max_round_trips: 3,
            tool_timeout: Duration::from_secs(5),
            ..SqlPilotConfig::default()
        };
        let limits = LoopLimits::from(&config);
        assert_eq!(limits.max_round_trips, 3);
        assert_eq!(limits.tool_timeout, Duration::from_secs(5));
        assert_eq!(LoopLimits::default().max_round_trips, 10);
    }
}
