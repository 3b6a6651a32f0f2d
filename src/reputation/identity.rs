//! Identity / reputation registry seam
//!
//! The registry lives outside this process (an on-chain contract in the travel
//! demo). The host only needs three calls, so they are expressed as a trait an
//! embedding application can implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// An agent registered in the identity registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_id: u64,
    pub domain: String,
    /// Account address of the agent
    pub address: String,
}

/// Receipt of a successful feedback authorization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationReceipt {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_auth_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
}

/// Hex private key used to sign registry transactions
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Identity and reputation registry
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Look up the agent registered under `domain`
    async fn resolve_by_domain(&self, domain: &str) -> Result<Option<AgentIdentity>>;

    /// Authorize `client_id` to leave feedback about `server_id`, signing
    /// with the server's key. `None` when the registry declined.
    async fn authorize_feedback(
        &self,
        client_id: u64,
        server_id: u64,
        signer: &SigningKey,
    ) -> Result<Option<AuthorizationReceipt>>;

    /// Register `name` under `domain` unless an identity already exists there.
    /// Returns the identity now on record, or `None` when registration is
    /// unsupported.
    async fn ensure_identity(
        &self,
        _name: &str,
        _domain: &str,
        _signer: &SigningKey,
    ) -> Result<Option<AgentIdentity>> {
        Ok(None)
    }

    /// Current feedback authorization id for the pair, read without a transaction
    async fn feedback_auth_id(&self, _client_id: u64, _server_id: u64) -> Result<Option<String>> {
        Ok(None)
    }

    /// Whether calls can succeed at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Registry used when no backend is configured; resolves nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIdentityRegistry;

#[async_trait]
impl IdentityRegistry for DisabledIdentityRegistry {
    async fn resolve_by_domain(&self, domain: &str) -> Result<Option<AgentIdentity>> {
        tracing::debug!(domain, "Identity registry disabled, skipping lookup");
        Ok(None)
    }

    async fn authorize_feedback(
        &self,
        _client_id: u64,
        _server_id: u64,
        _signer: &SigningKey,
    ) -> Result<Option<AuthorizationReceipt>> {
        Ok(None)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_debug_is_redacted() {
        let key = SigningKey::new("0xabc123");
        assert!(!format!("{:?}", key).contains("abc123"));
        assert_eq!(key.expose(), "0xabc123");
    }

    #[tokio::test]
    async fn test_disabled_registry_resolves_nothing() {
        let registry = DisabledIdentityRegistry;
        assert!(!registry.is_enabled());
        assert_eq!(registry.resolve_by_domain("finder.localhost:10002").await.unwrap(), None);
        assert_eq!(registry.feedback_auth_id(1, 2).await.unwrap(), None);
    }
}
