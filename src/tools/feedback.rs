//! `leave_feedback` and `authorize_feedback`
//!
//! Feedback is recorded locally in the ledger; only the authorization touches
//! the identity registry.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::agent::session::ConversationState;
use crate::core::{Result, ToolCall, ToolResult};
use crate::remote::RemoteAgentRegistry;
use crate::reputation::{AgentIdentity, FeedbackAuthorization, FeedbackAuthorizer, FeedbackLedger, FeedbackRecord};
use crate::tools::send_message::required_string;

pub const LEAVE_FEEDBACK: &str = "leave_feedback";
pub const AUTHORIZE_FEEDBACK: &str = "authorize_feedback";

/// Name under which this host is known to the identity registry
pub const HOST_AGENT_NAME: &str = "assistant";

/// Clamp a 1-5 rating and scale it to a percentage
pub fn rating_percent(rating: i64) -> u8 {
    (rating.clamp(1, 5) * 20) as u8
}

/// Executes the feedback tools
pub struct FeedbackTools {
    registry: Arc<RemoteAgentRegistry>,
    authorizer: Arc<FeedbackAuthorizer>,
    ledger: Arc<FeedbackLedger>,
}

impl FeedbackTools {
    pub fn new(
        registry: Arc<RemoteAgentRegistry>,
        authorizer: Arc<FeedbackAuthorizer>,
        ledger: Arc<FeedbackLedger>,
    ) -> Self {
        Self {
            registry,
            authorizer,
            ledger,
        }
    }

    async fn canonical_name(&self, requested: &str) -> String {
        self.registry
            .resolve(requested)
            .await
            .unwrap_or_else(|| requested.to_string())
    }

    async fn try_resolve(&self, name: &str) -> Option<AgentIdentity> {
        match self.authorizer.resolve_agent(name).await {
            Ok((_, identity)) => Some(identity),
            Err(e) => {
                warn!(agent = %name, error = %e, "Identity not resolved");
                None
            }
        }
    }

    /// Pick the feedback auth id of a granted authorization: the receipt's
    /// id, then the registry view, then a synthesized
    /// `eip155:<chain>:<client address>` id. No authorization, no id.
    ///
    /// The synthesized form only identifies the client account; it is a
    /// placeholder, not a registry-issued authorization.
    async fn feedback_auth_id(&self, authorization: Option<&FeedbackAuthorization>) -> Option<String> {
        let authorization = authorization?;
        if let Some(id) = &authorization.feedback_auth_id {
            return Some(id.clone());
        }
        if let Some(id) = self
            .authorizer
            .view_auth_id(authorization.client_agent_id, authorization.target_agent_id)
            .await
        {
            return Some(id);
        }
        let address = authorization.client_address.as_ref()?;
        Some(format!("eip155:{}:{}", self.authorizer.config().chain_id, address))
    }

    pub async fn leave_feedback(&self, call: &ToolCall, state: &ConversationState) -> Result<ToolResult> {
        let requested = required_string(call, "agent_name")?;
        let rating = call.get_i64("rating").unwrap_or(0);
        let percent = rating_percent(rating);
        let comment = call.get_string("comment").unwrap_or_default();

        let agent_name = self.canonical_name(&requested).await;
        let (variant, domain) = self.authorizer.domain_for(&agent_name)?;

        let client = self.try_resolve(HOST_AGENT_NAME).await;
        let target = self.try_resolve(&agent_name).await;

        let (authorization, auth_status) = match (&client, &target) {
            (Some(c), Some(t)) => match self.authorizer.cached(c.agent_id, t.agent_id).await {
                Some(cached) => (Some(cached), "already_authorized"),
                None => match self.authorizer.authorize(HOST_AGENT_NAME, &agent_name).await {
                    Ok(outcome) => (Some(outcome.authorization), outcome.status.as_str()),
                    Err(e) => {
                        warn!(agent = %agent_name, error = %e, "Inline feedback authorization failed");
                        (None, "unavailable")
                    }
                },
            },
            _ => (None, "unavailable"),
        };

        let feedback_auth_id = self.feedback_auth_id(authorization.as_ref()).await;

        let record = FeedbackRecord {
            feedback_auth_id,
            agent_skill_id: variant.label().to_string(),
            task_id: state.task_id_for(&agent_name).unwrap_or_default().to_string(),
            context_id: state.existing_context_id(&agent_name).unwrap_or_default().to_string(),
            rating_percent: percent,
            domain,
            notes: comment,
            proof_of_payment_tx_hash: None,
        };
        info!(agent = %agent_name, rating_percent = percent, authorization = auth_status, "Feedback recorded");
        self.ledger.append(record.clone()).await;

        Ok(ToolResult::success(
            LEAVE_FEEDBACK,
            json!({
                "status": "recorded",
                "agentName": agent_name,
                "authorization": auth_status,
                "record": record,
            }),
        ))
    }

    pub async fn authorize_feedback(&self, call: &ToolCall) -> Result<ToolResult> {
        let client = call
            .get_string("client_agent_name")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| HOST_AGENT_NAME.to_string());
        let target = required_string(call, "target_agent_name")?;
        let target = self.canonical_name(&target).await;

        let outcome = self.authorizer.authorize(&client, &target).await?;
        Ok(ToolResult::success(AUTHORIZE_FEEDBACK, outcome.to_json()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_percent_clamps() {
        assert_eq!(rating_percent(7), 100);
        assert_eq!(rating_percent(0), 20);
        assert_eq!(rating_percent(-3), 20);
        assert_eq!(rating_percent(3), 60);
        assert_eq!(rating_percent(5), 100);
    }
}
