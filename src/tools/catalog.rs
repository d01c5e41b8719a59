//! The fixed set of tools the model may call.

use serde::{Deserialize, Serialize};

/// Schema for one tool exposed by the tool server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: normalize_schema(input_schema),
        }
    }

    /// Render in the function-tool format Ollama expects.
    pub fn to_ollama(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// Some servers nest the JSON schema under a `json` key.
fn normalize_schema(schema: serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(mut map) if map.len() == 1 && map.contains_key("json") => {
            map.remove("json").unwrap_or_default()
        }
        serde_json::Value::Null => serde_json::json!({ "type": "object", "properties": {} }),
        other => other,
    }
}

/// Insertion-ordered tool catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: Vec<ToolSchema>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolSchema>) -> Self {
        let mut catalog = Self::default();
        for tool in tools {
            catalog.insert(tool);
        }
        catalog
    }

    /// Add a tool, replacing any previous tool with the same name.
    pub fn insert(&mut self, tool: ToolSchema) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSchema> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn to_ollama(&self) -> Vec<serde_json::Value> {
        self.tools.iter().map(ToolSchema::to_ollama).collect()
    }
}
