//! Turning raw model output into a [`ModelReply`].

use std::sync::OnceLock;

use regex::Regex;

use crate::error::SqlPilotError;
use crate::types::{JsonObject, ModelReply, ToolCallRequest};

/// A tool call as reported natively by the model server.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Interpret one model reply.
///
/// Native tool calls win. Otherwise a fenced ```json block (or a reply that
/// is nothing but a JSON object naming a tool) is read as a tool call, and any
/// other text is the final answer.
///
/// Malformed replies carry the raw output so it can be shown back to the model.
pub fn parse_reply(content: &str, native_calls: Vec<RawToolCall>) -> Result<ModelReply, SqlPilotError> {
    if let Some(call) = native_calls.into_iter().next() {
        let raw = native_call_text(&call);
        return native_to_request(call)
            .map(ModelReply::ToolCall)
            .map_err(|e| e.with_raw_output(&raw));
    }

    parse_content(content).map_err(|e| e.with_raw_output(content.trim()))
}

fn parse_content(content: &str) -> Result<ModelReply, SqlPilotError> {
    let text = strip_reasoning(content);
    let text = text.trim();
    if text.is_empty() {
        return Err(SqlPilotError::malformed("empty response", ""));
    }

    if let Some(block) = fenced_json(text) {
        let value: serde_json::Value = serde_json::from_str(block).map_err(|e| {
            SqlPilotError::malformed(format!("invalid JSON in tool call block: {e}"), "")
        })?;
        return json_to_request(value).map(ModelReply::ToolCall);
    }

    if text.starts_with('{') && text.ends_with('}') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
            if value.get("name").is_some() {
                return json_to_request(value).map(ModelReply::ToolCall);
            }
        }
    }

    Ok(ModelReply::final_text(text))
}

fn native_call_text(call: &RawToolCall) -> String {
    serde_json::json!({ "name": call.name, "arguments": call.arguments }).to_string()
}

fn native_to_request(call: RawToolCall) -> Result<ToolCallRequest, SqlPilotError> {
    if call.name.trim().is_empty() {
        return Err(SqlPilotError::malformed("tool call without a name", ""));
    }
    let arguments = coerce_arguments(&call.name, call.arguments)?;
    let request = ToolCallRequest::new(call.name, arguments);
    Ok(match call.id {
        Some(id) if !id.is_empty() => request.with_id(id),
        _ => request,
    })
}

fn json_to_request(value: serde_json::Value) -> Result<ToolCallRequest, SqlPilotError> {
    let serde_json::Value::Object(mut map) = value else {
        return Err(SqlPilotError::malformed(
            "tool call block is not a JSON object",
            "",
        ));
    };

    let name = match map.remove("name") {
        Some(serde_json::Value::String(name)) if !name.trim().is_empty() => name,
        _ => {
            return Err(SqlPilotError::malformed(
                "tool call block has no \"name\"",
                "",
            ))
        }
    };

    let arguments = ["input", "arguments", "parameters"]
        .iter()
        .find_map(|key| map.remove(*key))
        .unwrap_or(serde_json::Value::Null);

    Ok(ToolCallRequest::new(
        name.clone(),
        coerce_arguments(&name, arguments)?,
    ))
}

fn coerce_arguments(tool: &str, value: serde_json::Value) -> Result<JsonObject, SqlPilotError> {
    match value {
        serde_json::Value::Null => Ok(JsonObject::new()),
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(JsonObject::new()),
        serde_json::Value::String(raw) => match serde_json::from_str(raw.trim()) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            _ => Err(SqlPilotError::malformed(
                format!("arguments for '{tool}' are not a JSON object: {raw}"),
                "",
            )),
        },
        other => Err(SqlPilotError::malformed(
            format!("arguments for '{tool}' are not a JSON object: {other}"),
            "",
        )),
    }
}

fn fenced_json(text: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fence pattern is valid")
    });
    fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Drop `<think>...</think>` sections emitted by reasoning models.
fn strip_reasoning(content: &str) -> String {
    static THINK: OnceLock<Regex> = OnceLock::new();
    let think = THINK.get_or_init(|| {
        Regex::new(r"(?s)<think>.*?(</think>|$)").expect("think pattern is valid")
    });
    think.replace_all(content, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn expect_call(reply: ModelReply) -> ToolCallRequest {
        match reply {
            ModelReply::ToolCall(call) => call,
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_a_final_answer() {
        let reply = parse_reply("There are 1234 episodes.", Vec::new()).unwrap();
        assert_eq!(reply, ModelReply::final_text("There are 1234 episodes."));
    }

    #[test]
    fn native_call_takes_precedence_over_text() {
        let reply = parse_reply(
            "Let me check.",
            vec![RawToolCall {
                id: Some("call_7".into()),
                name: "list_tables".into(),
                arguments: json!({}),
            }],
        )
        .unwrap();
        let call = expect_call(reply);
        assert_eq!(call.id, "call_7");
        assert_eq!(call.name, "list_tables");
    }

    #[test]
    fn native_string_arguments_are_decoded() {
        let call = expect_call(
            parse_reply(
                "",
                vec![RawToolCall {
                    id: None,
                    name: "read_query".into(),
                    arguments: json!(r#"{"query":"SELECT 1"}"#),
                }],
            )
            .unwrap(),
        );
        assert_eq!(call.arguments["query"], "SELECT 1");
        assert!(!call.id.is_empty());
    }

    #[test]
    fn native_non_object_arguments_are_malformed() {
        let err = parse_reply(
            "",
            vec![RawToolCall {
                id: None,
                name: "read_query".into(),
                arguments: json!([1, 2]),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, SqlPilotError::MalformedResponse { .. }));
    }

    #[test]
    fn fenced_json_block_is_a_tool_call() {
        let content = "I'll run a query.\n```json\n{\n  \"name\": \"read_query\",\n  \"input\": {\"query\": \"SELECT COUNT(*) FROM categories\"}\n}\n```";
        let call = expect_call(parse_reply(content, Vec::new()).unwrap());
        assert_eq!(call.name, "read_query");
        assert_eq!(call.arguments["query"], "SELECT COUNT(*) FROM categories");
    }

    #[test]
    fn arguments_are_forwarded_unmodified() {
        let content = "```json\n{\"name\": \"read_query\", \"arguments\": {\"sql\": \"SELECT 1\"}}\n```";
        let call = expect_call(parse_reply(content, Vec::new()).unwrap());
        assert_eq!(
            serde_json::Value::Object(call.arguments),
            json!({"sql": "SELECT 1"})
        );
    }

    #[test]
    fn broken_fenced_json_is_malformed() {
        let err = parse_reply("```json\n{\"name\": \"read_query\", \n```", Vec::new()).unwrap_err();
        assert!(matches!(err, SqlPilotError::MalformedResponse { detail: msg, .. } if msg.contains("invalid JSON")));
    }

    #[test]
    fn malformed_reply_keeps_raw_output() {
        let content = "  Let me check.\n```json\n{\"name\": \"read_query\", \n```\n";
        match parse_reply(content, Vec::new()).unwrap_err() {
            SqlPilotError::MalformedResponse { raw, .. } => {
                assert_eq!(raw, "Let me check.\n```json\n{\"name\": \"read_query\", \n```")
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }

        let err = parse_reply(
            "",
            vec![RawToolCall {
                id: None,
                name: "read_query".into(),
                arguments: json!(42),
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SqlPilotError::MalformedResponse { raw, .. } if raw.contains("read_query") && raw.contains("42")
        ));
    }

    #[test]
    fn fenced_json_without_name_is_malformed() {
        let err = parse_reply("```json\n{\"input\": {}}\n```", Vec::new()).unwrap_err();
        assert!(matches!(err, SqlPilotError::MalformedResponse { detail: msg, .. } if msg.contains("name")));
    }

    #[test]
    fn bare_json_object_with_name_is_a_tool_call() {
        let call = expect_call(
            parse_reply(r#"{"name": "describe_table", "input": {"table_name": "episodes"}}"#, Vec::new())
                .unwrap(),
        );
        assert_eq!(call.name, "describe_table");
        assert_eq!(call.arguments["table_name"], "episodes");
    }

    #[test]
    fn bare_json_without_name_is_an_answer() {
        let reply = parse_reply(r#"{"count": 3}"#, Vec::new()).unwrap();
        assert_eq!(reply, ModelReply::final_text(r#"{"count": 3}"#));
    }

    #[test]
    fn empty_and_reasoning_only_replies_are_malformed() {
        assert!(matches!(
            parse_reply("   ", Vec::new()),
            Err(SqlPilotError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_reply("<think>hmm</think>\n", Vec::new()),
            Err(SqlPilotError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn reasoning_is_stripped_from_answers() {
        let reply = parse_reply("<think>count rows</think>\nThere are 3 tables.", Vec::new()).unwrap();
        assert_eq!(reply, ModelReply::final_text("There are 3 tables."));
    }
}
