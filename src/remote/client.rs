//! HTTP client for remote agents
//!
//! Fetches capability cards and sends `message/send` calls.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::core::{ConciergeError, Result};
use crate::remote::types::{AgentCard, OutboundMessage, RpcRequest, RpcResponse, SendOutcome};

/// Path of the capability card relative to an agent address
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Transport to remote agents
#[async_trait]
pub trait RemoteAgentClient: Send + Sync {
    /// Fetch the capability card served at `address`
    async fn fetch_card(&self, address: &str) -> Result<AgentCard>;

    /// Send one message to the agent at `endpoint`
    async fn send_task(&self, endpoint: &str, message: &OutboundMessage) -> Result<SendOutcome>;
}

/// reqwest-backed [`RemoteAgentClient`]
#[derive(Clone)]
pub struct HttpRemoteAgentClient {
    client: Client,
}

impl HttpRemoteAgentClient {
    /// Create a client whose every request is bounded by `timeout_secs`
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    fn map_send_error(address: &str, e: reqwest::Error) -> ConciergeError {
        if e.is_connect() || e.is_timeout() {
            ConciergeError::unavailable(format!("{}: {}", address, e))
        } else {
            ConciergeError::from(e)
        }
    }
}

fn card_url(address: &str) -> String {
    format!("{}{}", address.trim_end_matches('/'), AGENT_CARD_PATH)
}

#[async_trait]
impl RemoteAgentClient for HttpRemoteAgentClient {
    async fn fetch_card(&self, address: &str) -> Result<AgentCard> {
        let url = card_url(address);
        tracing::debug!(%url, "Fetching agent card");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::map_send_error(address, e))?;

        // Reachable but not serving a card: not a network failure
        if !response.status().is_success() {
            return Err(ConciergeError::Other(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        Ok(response.json::<AgentCard>().await?)
    }

    async fn send_task(&self, endpoint: &str, message: &OutboundMessage) -> Result<SendOutcome> {
        let request = RpcRequest::message_send(message);
        tracing::debug!(
            endpoint,
            message_id = %message.message_id,
            task_id = ?message.task_id,
            context_id = ?message.context_id,
            "Sending message"
        );

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_send_error(endpoint, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ConciergeError::unavailable(format!(
                "{} answered {}: {}",
                endpoint, status, body
            )));
        }

        let rpc: RpcResponse = response.json().await?;
        Ok(SendOutcome::from_response(rpc))
    }
}
