//! MCP client for a database tool server.

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientInfo, Content, ProtocolVersion,
        ResourceContents,
    },
    service::{ClientInitializeError, DynService, Peer, RoleClient, RunningService, ServiceError, ServiceExt},
};
use tokio::sync::Mutex;

use crate::error::SqlPilotError;
use crate::tools::{ToolOutput, ToolSchema, ToolServer};
use crate::types::JsonObject;
use crate::util::timeout::millis;

use crate::config::StdioServerConfig;

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// A connected MCP tool server.
pub struct MCPToolServer {
    peer: Peer<RoleClient>,
    session: Mutex<Option<MCPRunningService>>,
    label: String,
}

impl MCPToolServer {
    /// Spawn the server process and perform the MCP initialize handshake.
    pub async fn connect(config: &StdioServerConfig) -> Result<Self, SqlPilotError> {
        let transport = config.spawn()?;
        let client_info = ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };

        tracing::debug!(command = %config.display_command(), "starting MCP tool server");
        let session = client_info
            .into_dyn()
            .serve(transport)
            .await
            .map_err(map_client_initialize_error)?;

        Ok(Self::from_running_service(session, config.display_command()))
    }

    /// Wrap an already-initialized rmcp session.
    pub fn from_running_service(session: MCPRunningService, label: impl Into<String>) -> Self {
        Self {
            peer: session.peer().clone(),
            session: Mutex::new(Some(session)),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stop the session and the child process. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<(), SqlPilotError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session
            .cancel()
            .await
            .map(|reason| tracing::debug!(?reason, "MCP session closed"))
            .map_err(|e| SqlPilotError::tool_server("shutdown", e.to_string()))
    }
}

#[async_trait]
impl ToolServer for MCPToolServer {
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, SqlPilotError> {
        let tools = match self.peer.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                self.peer
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e))?
                    .tools
            }
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_tool_schema).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolOutput, SqlPilotError> {
        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| map_service_error(name, e))?;

        Ok(map_call_result(result))
    }
}

fn map_tool_schema(tool: rmcp::model::Tool) -> ToolSchema {
    ToolSchema::new(
        tool.name.to_string(),
        tool.description.map(|d| d.to_string()).unwrap_or_default(),
        serde_json::Value::Object((*tool.input_schema).clone()),
    )
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(result: CallToolResult) -> ToolOutput {
    let text = extract_text_content(&result.content)
        .or_else(|| result.structured_content.as_ref().map(|v| v.to_string()))
        .unwrap_or_default();

    if result.is_error.unwrap_or(false) {
        let text = if text.is_empty() {
            "tool returned an error result".to_string()
        } else {
            text
        };
        return ToolOutput::error(text);
    }

    ToolOutput::text(text)
}

fn map_client_initialize_error(error: ClientInitializeError) -> SqlPilotError {
    let message = match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("connection closed during initialize: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("transport error during initialize ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => format!(
            "JSON-RPC error {} during initialize: {}",
            error.code.0, error.message
        ),
        ClientInitializeError::Cancelled => "initialize cancelled".to_string(),
        other => format!("initialize failed: {other}"),
    };
    SqlPilotError::tool_server("initialize", message)
}

fn map_service_error(context: &str, error: ServiceError) -> SqlPilotError {
    match error {
        ServiceError::McpError(error) => SqlPilotError::tool_server(
            context,
            format!("MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::TransportSend(error) => {
            SqlPilotError::tool_server(context, format!("transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            SqlPilotError::tool_server(context, "transport closed")
        }
        ServiceError::UnexpectedResponse => {
            SqlPilotError::tool_server(context, "unexpected MCP response")
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            SqlPilotError::tool_server(context, format!("request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => SqlPilotError::Timeout(millis(timeout)),
        other => SqlPilotError::tool_server(context, format!("MCP service error: {other}")),
    }
}
