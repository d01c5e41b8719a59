//! Shared test helpers: a scripted model endpoint and a fake tool server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use sqlpilot::agent::Conversation;
use sqlpilot::error::SqlPilotError;
use sqlpilot::provider::{ModelEndpoint, ModelRequest};
use sqlpilot::tools::{ToolOutput, ToolSchema, ToolServer};
use sqlpilot::types::{JsonObject, ModelReply};

/// One scripted model response.
pub enum Step {
    Reply(ModelReply),
    /// An unparseable reply with this raw text.
    Malformed(&'static str),
    Unavailable(&'static str),
    /// Never answers; exercises the model timeout.
    Hang,
}

/// A model endpoint that replays queued steps and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<Conversation>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Conversations exactly as they were when each model call was made.
    pub fn requests(&self) -> Vec<Conversation> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelEndpoint for ScriptedModel {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelReply, SqlPilotError> {
        self.seen
            .lock()
            .unwrap()
            .push(request.conversation.clone());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Malformed(raw)) => Err(SqlPilotError::malformed("could not parse reply", raw)),
            Some(Step::Unavailable(detail)) => Err(SqlPilotError::ModelUnavailable(detail.into())),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SqlPilotError::ModelUnavailable("hang ended".into()))
            }
            None => panic!("scripted model ran out of steps"),
        }
    }
}

type Handler = dyn Fn(&str, &JsonObject) -> Result<ToolOutput, SqlPilotError> + Send + Sync;

/// A tool server with a fixed catalog and a caller-supplied handler.
pub struct FakeToolServer {
    tools: Vec<ToolSchema>,
    handler: Box<Handler>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, JsonObject)>>,
}

impl FakeToolServer {
    pub fn new(
        handler: impl Fn(&str, &JsonObject) -> Result<ToolOutput, SqlPilotError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            tools: sqlite_tools(),
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the same text.
    pub fn constant(text: &'static str) -> Self {
        Self::new(move |_, _| Ok(ToolOutput::text(text)))
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, JsonObject)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolServer for FakeToolServer {
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, SqlPilotError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolOutput, SqlPilotError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(name, &arguments)
    }
}

/// The catalog `mcp-server-sqlite` advertises, trimmed to what the tests use.
pub fn sqlite_tools() -> Vec<ToolSchema> {
    vec![
        ToolSchema::new(
            "read_query",
            "Execute a SELECT query on the SQLite database",
            json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        ),
        ToolSchema::new(
            "list_tables",
            "List all tables in the SQLite database",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolSchema::new(
            "describe_table",
            "Get the schema information for a specific table",
            json!({
                "type": "object",
                "properties": { "table_name": { "type": "string" } },
                "required": ["table_name"]
            }),
        ),
    ]
}

pub fn args(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
