//! Wire types for the remote agent task protocol
//!
//! Only the fields the host actually reads or writes are modelled; everything
//! else in a card or task is carried through as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Capability document served at `/.well-known/agent-card.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registrations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_models: Vec<String>,
}

/// One skill advertised in an agent card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A registered remote agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
    /// Address that actually answered the card probe
    pub endpoint_url: String,
}

/// Name and description pair listed to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
}

/// Text part of an outbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub kind: String,
    pub text: String,
}

/// Message sent to a remote agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub role: String,
    pub parts: Vec<TextPart>,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl OutboundMessage {
    /// A single-part user message with a fresh message id
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![TextPart {
                kind: "text".to_string(),
                text: text.into(),
            }],
            message_id: uuid::Uuid::new_v4().to_string(),
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }

    /// Text of the first part
    pub fn text(&self) -> &str {
        self.parts.first().map(|p| p.text.as_str()).unwrap_or("")
    }
}

/// A task returned by a remote agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub status: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Value>,
    #[serde(default = "task_kind")]
    pub kind: String,
}

fn task_kind() -> String {
    "task".to_string()
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What a remote agent answered to `message/send`
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// A task the host can correlate on
    Task(Task),
    /// A direct message or any other non-task result
    Message(Value),
    /// JSON-RPC level error
    Rejected(RpcError),
}

impl SendOutcome {
    /// Classify the `result`/`error` members of a JSON-RPC response
    pub fn from_response(response: RpcResponse) -> Self {
        if let Some(error) = response.error {
            return Self::Rejected(error);
        }
        let result = response.result.unwrap_or(Value::Null);
        if result.get("kind").and_then(Value::as_str) == Some("task") {
            if let Ok(task) = serde_json::from_value::<Task>(result.clone()) {
                return Self::Task(task);
            }
        }
        Self::Message(result)
    }
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'static str,
    pub params: P,
}

/// Parameters of `message/send`
#[derive(Debug, Clone, Serialize)]
pub struct MessageSendParams<'a> {
    pub message: &'a OutboundMessage,
}

impl<'a> RpcRequest<MessageSendParams<'a>> {
    /// Wrap `message` in a `message/send` call keyed by its message id
    pub fn message_send(message: &'a OutboundMessage) -> Self {
        Self {
            jsonrpc: "2.0",
            id: message.message_id.clone(),
            method: "message/send",
            params: MessageSendParams { message },
        }
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}
