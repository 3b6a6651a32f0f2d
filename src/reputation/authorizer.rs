//! Feedback authorization with a process-lifetime cache
//!
//! Before the host can leave feedback about a remote agent, the remote agent
//! must authorize the host in the identity registry. Each (client, target)
//! pair is authorized at most once per process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::core::config::IdentityConfig;
use crate::core::{AgentVariant, ConciergeError, Result};
use crate::reputation::identity::{AgentIdentity, IdentityRegistry, SigningKey};

/// A granted feedback authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAuthorization {
    pub client_agent_id: u64,
    pub target_agent_id: u64,
    pub client_address: Option<String>,
    pub feedback_auth_id: Option<String>,
    pub tx_hash: String,
}

/// How an authorization request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// A new registry transaction was made
    Authorized,
    /// The pair was already in the cache
    AlreadyAuthorized,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::AlreadyAuthorized => "already_authorized",
        }
    }
}

/// Result of [`FeedbackAuthorizer::authorize`]
#[derive(Debug, Clone)]
pub struct AuthorizationOutcome {
    pub status: AuthorizationStatus,
    pub authorization: FeedbackAuthorization,
}

impl AuthorizationOutcome {
    /// Payload handed back to the model
    pub fn to_json(&self) -> serde_json::Value {
        let mut payload = json!({
            "status": self.status.as_str(),
            "clientAgentId": self.authorization.client_agent_id,
            "targetAgentId": self.authorization.target_agent_id,
            "txHash": self.authorization.tx_hash,
        });
        if let Some(id) = &self.authorization.feedback_auth_id {
            payload["feedbackAuthId"] = json!(id);
        }
        payload
    }
}

/// Authorizes feedback through the identity registry, once per agent pair
pub struct FeedbackAuthorizer {
    identity: Arc<dyn IdentityRegistry>,
    config: IdentityConfig,
    cache: RwLock<HashMap<(u64, u64), FeedbackAuthorization>>,
    /// Serializes [`authorize`](Self::authorize); readers never wait on it
    write_gate: Mutex<()>,
}

impl FeedbackAuthorizer {
    pub fn new(identity: Arc<dyn IdentityRegistry>, config: IdentityConfig) -> Self {
        Self {
            identity,
            config,
            cache: RwLock::new(HashMap::new()),
            write_gate: Mutex::new(()),
        }
    }

    /// Identity settings in use
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Whether the underlying registry is live
    pub fn is_enabled(&self) -> bool {
        self.identity.is_enabled()
    }

    /// Run one registry call under the configured timeout
    async fn bounded<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ConciergeError::unavailable(format!(
                "identity registry timed out after {}s during {}",
                self.config.timeout_secs, what
            ))),
        }
    }

    /// Registry domain configured for the agent called `name`
    pub fn domain_for(&self, name: &str) -> Result<(AgentVariant, String)> {
        let variant = AgentVariant::detect(name)
            .ok_or_else(|| ConciergeError::identity(format!("no registry domain for agent '{}'", name)))?;
        Ok((variant, self.config.domains.for_variant(variant).to_string()))
    }

    /// Look up `domain` in the registry
    pub async fn resolve_domain(&self, domain: &str) -> Result<Option<AgentIdentity>> {
        self.bounded("resolve_by_domain", self.identity.resolve_by_domain(domain))
            .await
    }

    /// Resolve the identity of the agent called `name`
    pub async fn resolve_agent(&self, name: &str) -> Result<(AgentVariant, AgentIdentity)> {
        let (variant, domain) = self.domain_for(name)?;
        let identity = self
            .resolve_domain(&domain)
            .await?
            .ok_or_else(|| ConciergeError::identity(format!("domain '{}' is not registered", domain)))?;
        Ok((variant, identity))
    }

    /// Make sure the host itself is registered, signing with the assistant key.
    ///
    /// Best effort: a missing key or a registry failure is logged and yields `None`.
    pub async fn ensure_host_identity(&self, name: &str) -> Option<AgentIdentity> {
        if !self.identity.is_enabled() {
            return None;
        }
        let domain = self.config.domains.for_variant(AgentVariant::Assistant).to_string();
        let Some(signer) = self.config.keys.for_variant(AgentVariant::Assistant).map(SigningKey::new) else {
            info!(%domain, "No assistant signing key, skipping identity registration");
            return None;
        };

        match self
            .bounded("ensure_identity", self.identity.ensure_identity(name, &domain, &signer))
            .await
        {
            Ok(Some(identity)) => {
                info!(agent_id = identity.agent_id, %domain, "Host identity registered");
                Some(identity)
            }
            Ok(None) => {
                debug!(%domain, "Identity registry did not register the host");
                None
            }
            Err(e) => {
                warn!(%domain, error = %e, "Host identity registration failed");
                None
            }
        }
    }

    /// Authorization already granted for the pair
    pub async fn cached(&self, client_id: u64, target_id: u64) -> Option<FeedbackAuthorization> {
        self.cache.read().await.get(&(client_id, target_id)).cloned()
    }

    /// Authorization id as currently reported by the registry's read view
    pub async fn view_auth_id(&self, client_id: u64, target_id: u64) -> Option<String> {
        match self
            .bounded("feedback_auth_id", self.identity.feedback_auth_id(client_id, target_id))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(client_id, target_id, error = %e, "Feedback auth id lookup failed");
                None
            }
        }
    }

    /// Authorize `client_name` to leave feedback about `target_name`.
    ///
    /// Writers hold the gate for the whole call so concurrent requests for
    /// the same pair produce a single registry transaction. Cache reads only
    /// take the read lock.
    pub async fn authorize(&self, client_name: &str, target_name: &str) -> Result<AuthorizationOutcome> {
        let _gate = self.write_gate.lock().await;

        let (_, client) = self.resolve_agent(client_name).await?;
        let (target_variant, target) = self.resolve_agent(target_name).await?;
        let key = (client.agent_id, target.agent_id);

        if let Some(existing) = self.cached(key.0, key.1).await {
            debug!(client_id = key.0, target_id = key.1, "Feedback already authorized");
            return Ok(AuthorizationOutcome {
                status: AuthorizationStatus::AlreadyAuthorized,
                authorization: existing,
            });
        }

        let signer = self
            .config
            .keys
            .for_variant(target_variant)
            .map(SigningKey::new)
            .ok_or_else(|| {
                ConciergeError::identity(format!("no signing key for {} agent", target_variant))
            })?;

        let receipt = self
            .bounded(
                "authorize_feedback",
                self.identity.authorize_feedback(client.agent_id, target.agent_id, &signer),
            )
            .await?
            .ok_or_else(|| {
                ConciergeError::identity(format!(
                    "registry declined authorization of {} for {}",
                    client.agent_id, target.agent_id
                ))
            })?;

        let authorization = FeedbackAuthorization {
            client_agent_id: client.agent_id,
            target_agent_id: target.agent_id,
            client_address: receipt.client_address.or(Some(client.address)),
            feedback_auth_id: receipt.feedback_auth_id,
            tx_hash: receipt.tx_hash,
        };
        info!(
            client_id = key.0,
            target_id = key.1,
            tx_hash = %authorization.tx_hash,
            "Feedback authorized"
        );
        self.cache.write().await.insert(key, authorization.clone());

        Ok(AuthorizationOutcome {
            status: AuthorizationStatus::Authorized,
            authorization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SigningKeys;
    use crate::reputation::identity::AuthorizationReceipt;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRegistry {
        authorize_calls: AtomicUsize,
        ensure_calls: std::sync::Mutex<Vec<(String, String)>>,
        delay: Duration,
    }

    #[async_trait]
    impl IdentityRegistry for CountingRegistry {
        async fn resolve_by_domain(&self, domain: &str) -> Result<Option<AgentIdentity>> {
            let agent_id = match AgentVariant::detect(domain) {
                Some(AgentVariant::Assistant) => 1,
                Some(AgentVariant::Finder) => 2,
                Some(AgentVariant::Reserve) => 3,
                _ => return Ok(None),
            };
            Ok(Some(AgentIdentity {
                agent_id,
                domain: domain.to_string(),
                address: format!("0x{:040}", agent_id),
            }))
        }

        async fn authorize_feedback(
            &self,
            client_id: u64,
            server_id: u64,
            _signer: &SigningKey,
        ) -> Result<Option<AuthorizationReceipt>> {
            tokio::time::sleep(self.delay).await;
            self.authorize_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(AuthorizationReceipt {
                tx_hash: format!("0xtx{}{}", client_id, server_id),
                feedback_auth_id: None,
                client_address: None,
            }))
        }

        async fn ensure_identity(
            &self,
            name: &str,
            domain: &str,
            _signer: &SigningKey,
        ) -> Result<Option<AgentIdentity>> {
            self.ensure_calls
                .lock()
                .unwrap()
                .push((name.to_string(), domain.to_string()));
            self.resolve_by_domain(domain).await
        }
    }

    fn config_with_key(key: Option<&str>, timeout_secs: u64) -> IdentityConfig {
        IdentityConfig {
            timeout_secs,
            keys: SigningKeys {
                default: key.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn authorizer(delay: Duration, key: Option<&str>, timeout_secs: u64) -> (Arc<CountingRegistry>, FeedbackAuthorizer) {
        let registry = Arc::new(CountingRegistry {
            authorize_calls: AtomicUsize::new(0),
            ensure_calls: std::sync::Mutex::new(Vec::new()),
            delay,
        });
        let authorizer = FeedbackAuthorizer::new(registry.clone(), config_with_key(key, timeout_secs));
        (registry, authorizer)
    }

    #[tokio::test]
    async fn test_second_authorization_hits_cache() {
        let (registry, authorizer) = authorizer(Duration::ZERO, Some("0xkey"), 5);

        let first = authorizer.authorize("assistant", "Airbnb Agent - Finder").await.unwrap();
        let second = authorizer.authorize("assistant", "Airbnb Agent - Finder").await.unwrap();

        assert_eq!(first.status, AuthorizationStatus::Authorized);
        assert_eq!(second.status, AuthorizationStatus::AlreadyAuthorized);
        assert_eq!(second.to_json()["status"], "already_authorized");
        assert_eq!(first.authorization, second.authorization);
        assert_eq!(registry.authorize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            first.authorization.client_address.as_deref(),
            Some("0x0000000000000000000000000000000000000001")
        );
    }

    #[tokio::test]
    async fn test_concurrent_authorizations_single_transaction() {
        let (registry, authorizer) = authorizer(Duration::from_millis(20), Some("0xkey"), 5);
        let authorizer = Arc::new(authorizer);

        let a = tokio::spawn({
            let authorizer = authorizer.clone();
            async move { authorizer.authorize("assistant", "Airbnb Agent - Reserve").await }
        });
        let b = tokio::spawn({
            let authorizer = authorizer.clone();
            async move { authorizer.authorize("assistant", "Airbnb Agent - Reserve").await }
        });

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert_eq!(registry.authorize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_identity_error() {
        let (registry, authorizer) = authorizer(Duration::ZERO, None, 5);
        let err = authorizer.authorize("assistant", "Airbnb Agent - Finder").await.unwrap_err();
        assert_eq!(err.kind(), "identity_unresolved");
        assert_eq!(registry.authorize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_target_is_identity_error() {
        let (_, authorizer) = authorizer(Duration::ZERO, Some("0xkey"), 5);
        let err = authorizer.authorize("assistant", "Weather Agent").await.unwrap_err();
        assert!(matches!(err, ConciergeError::IdentityUnresolved(_)));
    }

    #[tokio::test]
    async fn test_slow_registry_times_out() {
        let (_, authorizer) = authorizer(Duration::from_secs(3), Some("0xkey"), 1);
        let err = authorizer.authorize("assistant", "Airbnb Agent - Finder").await.unwrap_err();
        assert_eq!(err.kind(), "collaborator_unavailable");
        assert!(authorizer.cached(1, 2).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_reads_do_not_wait_for_authorization() {
        let (_, authorizer) = authorizer(Duration::from_millis(500), Some("0xkey"), 5);
        let authorizer = Arc::new(authorizer);

        let slow = tokio::spawn({
            let authorizer = authorizer.clone();
            async move { authorizer.authorize("assistant", "Airbnb Agent - Finder").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let read = tokio::time::timeout(Duration::from_millis(100), authorizer.cached(1, 99)).await;
        assert_eq!(read.ok(), Some(None));

        assert!(slow.await.unwrap().is_ok());
        assert!(authorizer.cached(1, 2).await.is_some());
    }

    #[tokio::test]
    async fn test_host_identity_uses_assistant_domain() {
        let (registry, authorizer) = authorizer(Duration::ZERO, Some("0xkey"), 5);
        let identity = authorizer.ensure_host_identity("assistant").await.unwrap();
        assert_eq!(identity.agent_id, 1);
        assert_eq!(
            *registry.ensure_calls.lock().unwrap(),
            vec![("assistant".to_string(), authorizer.config().domains.assistant.clone())]
        );
    }

    #[tokio::test]
    async fn test_host_identity_skipped_without_key() {
        let (registry, authorizer) = authorizer(Duration::ZERO, None, 5);
        assert!(authorizer.ensure_host_identity("assistant").await.is_none());
        assert!(registry.ensure_calls.lock().unwrap().is_empty());
    }
}
