//! Events streamed to the caller while a message is routed

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observable step of the routing loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingEvent {
    /// The model asked for a tool; content holds the decoded arguments
    ToolCall { name: String, content: Value },
    /// A tool finished; content holds its structured result
    ToolResponse { name: String, content: Value },
    /// The answer for the user; always the last event
    Final { content: String },
}

impl RoutingEvent {
    /// Whether this is the closing event
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final { .. })
    }
}
