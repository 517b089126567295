//! Normalized tool definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool exposed by a backend service, normalized from discovery or
/// declared by hand for API bridges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name as the backend reports it
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// JSON-Schema object describing the arguments; `{}` means unknown
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// The schema to advertise over MCP: an empty or non-object schema is
    /// replaced by the minimal permissive object schema.
    pub fn effective_schema(&self) -> Value {
        match &self.input_schema {
            Value::Object(map) if !map.is_empty() => self.input_schema.clone(),
            _ => empty_object_schema(),
        }
    }

    /// The `properties` map of the schema, if any
    pub fn schema_properties(&self) -> Option<&serde_json::Map<String, Value>> {
        self.input_schema.get("properties").and_then(Value::as_object)
    }
}

/// `{"type":"object","properties":{}}`
pub fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Decode a stored JSON-text tools column. Unparseable or empty text is an
/// empty list, per the registry's tolerance for legacy rows.
pub fn tools_from_json(text: &str) -> Vec<ToolDefinition> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(text).unwrap_or_default()
}

/// Encode a tools list for the JSON-text column
pub fn tools_to_json(tools: &[ToolDefinition]) -> String {
    serde_json::to_string(tools).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_schema_fallback() {
        let tool = ToolDefinition::new("search", "", Value::Null);
        assert_eq!(tool.effective_schema(), empty_object_schema());

        let schema = serde_json::json!({"type":"object","properties":{"q":{"type":"string"}}});
        let tool = ToolDefinition::new("search", "", schema.clone());
        assert_eq!(tool.effective_schema(), schema);
    }

    #[test]
    fn test_tools_round_trip() {
        let tools = vec![ToolDefinition::new(
            "search",
            "web search",
            serde_json::json!({"type":"object","properties":{}}),
        )];
        let text = tools_to_json(&tools);
        assert_eq!(tools_from_json(&text), tools);
    }

    #[test]
    fn test_bad_json_is_empty() {
        assert!(tools_from_json("not json").is_empty());
        assert!(tools_from_json("").is_empty());
    }
}
