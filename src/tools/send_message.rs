//! `send_message` - delegate a task to a remote agent
//!
//! Keeps task and context ids per agent so follow-ups land in the same
//! remote conversation.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::agent::session::ConversationState;
use crate::core::{AgentVariant, ConciergeError, Result, ToolCall, ToolResult};
use crate::remote::{OutboundMessage, RemoteAgentClient, RemoteAgentRegistry, SendOutcome};
use crate::reputation::FeedbackAuthorizer;

pub const TOOL_NAME: &str = "send_message";

/// Executes `send_message` calls
pub struct SendMessageTool {
    registry: Arc<RemoteAgentRegistry>,
    client: Arc<dyn RemoteAgentClient>,
    authorizer: Arc<FeedbackAuthorizer>,
}

pub(crate) fn required_string(call: &ToolCall, key: &str) -> Result<String> {
    call.get_string(key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ConciergeError::MalformedToolArguments {
            tool: call.name.clone(),
            message: format!("missing '{}'", key),
        })
}

impl SendMessageTool {
    pub fn new(
        registry: Arc<RemoteAgentRegistry>,
        client: Arc<dyn RemoteAgentClient>,
        authorizer: Arc<FeedbackAuthorizer>,
    ) -> Self {
        Self {
            registry,
            client,
            authorizer,
        }
    }

    /// Registry id of this host, attached to outbound metadata when known
    async fn host_agent_id(&self) -> Option<u64> {
        let domain = self
            .authorizer
            .config()
            .domains
            .for_variant(AgentVariant::Assistant)
            .to_string();
        match self.authorizer.resolve_domain(&domain).await {
            Ok(identity) => identity.map(|i| i.agent_id),
            Err(e) => {
                debug!(%domain, error = %e, "Host identity lookup failed");
                None
            }
        }
    }

    pub async fn execute(&self, call: &ToolCall, state: &mut ConversationState) -> Result<ToolResult> {
        let requested = call.get_string("agent_name").unwrap_or_default();
        let task = call.get_string("task").unwrap_or_default();

        let Some(agent_name) = self.registry.resolve(&requested).await else {
            return Err(ConciergeError::agent_not_found(requested, self.registry.names().await));
        };
        state.set_active_agent(&agent_name);

        let descriptor = self
            .registry
            .descriptor(&agent_name)
            .await
            .ok_or_else(|| ConciergeError::unavailable(format!("no endpoint for '{}'", agent_name)))?;

        let mut message = OutboundMessage::user_text(task);
        message.task_id = state.task_id_for(&agent_name).map(str::to_string);
        message.context_id = Some(state.context_id_for(&agent_name));
        if let Some(id) = self.host_agent_id().await {
            message.metadata = Some(json!({ "client_agent_id": id }));
        }

        info!(agent = %agent_name, endpoint = %descriptor.endpoint_url, "Delegating task");
        let outcome = self.client.send_task(&descriptor.endpoint_url, &message).await?;

        match outcome {
            SendOutcome::Task(task) => {
                state.remember_task_id(&agent_name, task.id.clone());
                Ok(ToolResult::success(TOOL_NAME, serde_json::to_value(&task)?))
            }
            SendOutcome::Message(value) => {
                warn!(agent = %agent_name, "Agent answered without a task");
                Ok(no_usable_result(&agent_name, json!({ "response": value })))
            }
            SendOutcome::Rejected(error) => {
                warn!(agent = %agent_name, code = error.code, message = %error.message, "Agent rejected message");
                Ok(no_usable_result(&agent_name, json!({ "error": error })))
            }
        }
    }
}

fn no_usable_result(agent_name: &str, mut detail: Value) -> ToolResult {
    detail["status"] = json!("no_result");
    detail["message"] = json!(format!("Agent '{}' returned no usable result", agent_name));
    ToolResult::failure(TOOL_NAME, detail)
}
