//! Shared types used across Concierge modules
//!
//! Contains message structures, tool definitions, and common data types.

use serde::{Deserialize, Serialize};

/// A message in the routing transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant, tool)
    pub role: String,
    /// Content of the message
    pub content: String,
    /// Tool calls requested by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Id of the tool call this message answers (tool role only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this message (tool role only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::assistant(content)
        }
    }

    /// Create a tool result message answering `call`
    pub fn tool(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::with_role("tool", content)
        }
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back in the tool result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get an integer argument by key, accepting numeric strings
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.arguments.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.round() as i64))
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Name of the underlying function
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Result of executing a tool
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Structured payload handed back to the model
    pub content: serde_json::Value,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            content,
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            content,
        }
    }

    /// Content serialized for the transcript
    pub fn content_string(&self) -> String {
        self.content.to_string()
    }
}

/// Deployment role of an agent in the travel demo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentVariant {
    /// The routing host itself
    Assistant,
    /// Airbnb listing search
    Finder,
    /// Airbnb reservation
    Reserve,
    /// Weather forecasts
    Weather,
}

impl AgentVariant {
    /// Infer the variant from an agent name, domain or hostname
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("reserve") || lower.contains("booking") {
            Some(Self::Reserve)
        } else if lower.contains("finder") || lower.contains("airbnb") || lower.contains("seller") {
            Some(Self::Finder)
        } else if lower.contains("weather") {
            Some(Self::Weather)
        } else if lower.contains("assistant") || lower.contains("host") {
            Some(Self::Assistant)
        } else {
            None
        }
    }

    /// Lowercase label, also used as path segment and skill id
    pub fn label(&self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::Finder => "finder",
            Self::Reserve => "reserve",
            Self::Weather => "weather",
        }
    }
}

impl std::fmt::Display for AgentVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
