//! Tool dispatcher - schemas and execution for the routing tools
//!
//! Every failure is turned into a structured payload for the model, so a
//! bad tool call never ends the routing loop.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::agent::session::ConversationState;
use crate::core::{ToolCall, ToolDefinition, ToolResult};
use crate::remote::{RemoteAgentClient, RemoteAgentRegistry};
use crate::reputation::{FeedbackAuthorizer, FeedbackLedger};
use crate::tools::feedback::{FeedbackTools, AUTHORIZE_FEEDBACK, LEAVE_FEEDBACK};
use crate::tools::send_message::{self, SendMessageTool};

/// Routes tool calls to their implementations
pub struct ToolDispatcher {
    send_message: SendMessageTool,
    feedback: FeedbackTools,
}

impl ToolDispatcher {
    pub fn new(
        registry: Arc<RemoteAgentRegistry>,
        client: Arc<dyn RemoteAgentClient>,
        authorizer: Arc<FeedbackAuthorizer>,
        ledger: Arc<FeedbackLedger>,
    ) -> Self {
        Self {
            send_message: SendMessageTool::new(registry.clone(), client, authorizer.clone()),
            feedback: FeedbackTools::new(registry, authorizer, ledger),
        }
    }

    /// Tool schemas for the current set of agent names
    pub fn definitions(agent_names: &[String]) -> Vec<ToolDefinition> {
        let mut agent_name = json!({
            "type": "string",
            "description": "Name of the remote agent"
        });
        if !agent_names.is_empty() {
            agent_name["enum"] = json!(agent_names);
        }

        vec![
            ToolDefinition::function(
                send_message::TOOL_NAME,
                "Send a task to a remote agent and obtain its response.",
                json!({
                    "type": "object",
                    "properties": {
                        "agent_name": agent_name,
                        "task": {
                            "type": "string",
                            "description": "Task to send to the agent, with all context it needs"
                        }
                    },
                    "required": ["agent_name", "task"]
                }),
            ),
            ToolDefinition::function(
                LEAVE_FEEDBACK,
                "Record the user's rating and comment about a remote agent.",
                json!({
                    "type": "object",
                    "properties": {
                        "agent_name": {
                            "type": "string",
                            "description": "Name of the agent the feedback is about"
                        },
                        "rating": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": 5,
                            "description": "Rating from 1 (poor) to 5 (excellent)"
                        },
                        "comment": {
                            "type": "string",
                            "description": "Free-form comment"
                        }
                    },
                    "required": ["agent_name", "rating"]
                }),
            ),
            ToolDefinition::function(
                AUTHORIZE_FEEDBACK,
                "Authorize a client agent to leave feedback about a target agent.",
                json!({
                    "type": "object",
                    "properties": {
                        "client_agent_name": {
                            "type": "string",
                            "description": "Agent that will leave feedback (usually this assistant)"
                        },
                        "target_agent_name": {
                            "type": "string",
                            "description": "Agent the feedback is about"
                        }
                    },
                    "required": ["target_agent_name"]
                }),
            ),
        ]
    }

    /// Execute one tool call; never fails
    pub async fn execute(&self, call: &ToolCall, state: &mut ConversationState) -> ToolResult {
        debug!(tool = %call.name, arguments = %call.arguments, "Executing tool");

        let result = match call.name.as_str() {
            send_message::TOOL_NAME => self.send_message.execute(call, state).await,
            LEAVE_FEEDBACK => self.feedback.leave_feedback(call, state).await,
            AUTHORIZE_FEEDBACK => self.feedback.authorize_feedback(call).await,
            other => {
                warn!(tool = %other, "Model called an unknown tool");
                return ToolResult::failure(other, unknown_tool_payload(other));
            }
        };

        match result {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                ToolResult::failure(call.name.clone(), e.to_tool_payload())
            }
        }
    }
}

fn unknown_tool_payload(name: &str) -> serde_json::Value {
    json!({
        "status": "error",
        "kind": "unknown_tool",
        "message": format!("Unknown tool: {}", name),
    })
}
