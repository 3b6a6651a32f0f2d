//! Remote agent registry
//!
//! Probes agent addresses for their capability cards, indexes them by the
//! declared card name and resolves the loosely-spelled names a model produces.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{AgentVariant, Result};
use crate::remote::client::RemoteAgentClient;
use crate::remote::types::{AgentDescriptor, AgentSummary};

/// Colloquial names mapped to the card names the demo agents declare
const ALIASES: &[(&str, &str)] = &[
    ("seller agent", "Airbnb Agent - Finder"),
    ("seller", "Airbnb Agent - Finder"),
    ("airbnb", "Airbnb Agent - Finder"),
    ("airbnb agent", "Airbnb Agent - Finder"),
    ("finder", "Airbnb Agent - Finder"),
    ("reserve", "Airbnb Agent - Reserve"),
    ("reservation agent", "Airbnb Agent - Reserve"),
    ("booking agent", "Airbnb Agent - Reserve"),
    ("weather", "Weather Agent"),
];

/// Registry of reachable remote agents
pub struct RemoteAgentRegistry {
    client: Arc<dyn RemoteAgentClient>,
    /// Addresses re-probed by [`refresh_if_empty`](Self::refresh_if_empty)
    addresses: Vec<String>,
    agents: RwLock<HashMap<String, AgentDescriptor>>,
    refresh_gate: Mutex<()>,
}

impl RemoteAgentRegistry {
    /// Create an empty registry that will probe `addresses` on refresh
    pub fn new(client: Arc<dyn RemoteAgentClient>, addresses: Vec<String>) -> Self {
        Self {
            client,
            addresses,
            agents: RwLock::new(HashMap::new()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Addresses this registry probes
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Probe one address and index the agent under its declared name.
    ///
    /// A `<sub>.localhost` address that cannot be reached is retried exactly
    /// once against the path-routed form on plain `localhost`. Other failures
    /// (bad card, error status) are returned as is.
    pub async fn register(&self, address: &str) -> Result<AgentDescriptor> {
        let (card, endpoint) = match self.client.fetch_card(address).await {
            Ok(card) => (card, address.to_string()),
            Err(e) if !e.is_network() => return Err(e),
            Err(e) => {
                let Some(fallback) = fallback_address(address) else {
                    return Err(e);
                };
                warn!(address, %fallback, error = %e, "Card probe failed, retrying fallback address");
                let card = self.client.fetch_card(&fallback).await?;
                (card, fallback)
            }
        };

        let descriptor = AgentDescriptor {
            name: card.name.clone(),
            description: card.description.clone(),
            endpoint_url: endpoint,
        };

        let mut agents = self.agents.write().await;
        if agents.contains_key(&descriptor.name) {
            warn!(name = %descriptor.name, "Duplicate agent name, replacing earlier registration");
        }
        agents.insert(descriptor.name.clone(), descriptor.clone());
        info!(name = %descriptor.name, endpoint = %descriptor.endpoint_url, "Registered remote agent");

        Ok(descriptor)
    }

    /// Register every address, logging and skipping failures.
    /// Returns how many agents registered.
    pub async fn register_all(&self, addresses: &[String]) -> usize {
        let mut registered = 0;
        for address in addresses {
            match self.register(address).await {
                Ok(_) => registered += 1,
                Err(e) => warn!(address = %address, error = %e, "Failed to register remote agent"),
            }
        }
        registered
    }

    /// Re-probe the configured addresses when nothing is registered.
    ///
    /// Concurrent callers queue on the refresh gate, so only one probe round
    /// runs at a time and later callers see its result.
    pub async fn refresh_if_empty(&self) -> usize {
        let _gate = self.refresh_gate.lock().await;
        if !self.agents.read().await.is_empty() {
            return 0;
        }
        debug!(addresses = self.addresses.len(), "Registry empty, probing agents");
        self.register_all(&self.addresses).await
    }

    /// Forget every registered agent
    pub async fn clear(&self) {
        self.agents.write().await.clear();
    }

    /// Map a requested name onto a registered one
    pub async fn resolve(&self, requested: &str) -> Option<String> {
        let requested = requested.trim();
        if requested.is_empty() {
            return None;
        }

        let agents = self.agents.read().await;
        if agents.contains_key(requested) {
            return Some(requested.to_string());
        }

        let lower = requested.to_lowercase();
        let mut names: Vec<&String> = agents.keys().collect();
        names.sort();

        if let Some(name) = names.iter().find(|n| n.to_lowercase() == lower) {
            return Some((*name).clone());
        }

        if let Some((_, target)) = ALIASES
            .iter()
            .find(|(alias, target)| *alias == lower && agents.contains_key(*target))
        {
            return Some(target.to_string());
        }

        names
            .into_iter()
            .find(|n| {
                let n = n.to_lowercase();
                n.contains(&lower) || lower.contains(&n)
            })
            .cloned()
    }

    /// Registered agent names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name and description of every agent, sorted by name
    pub async fn list_all(&self) -> Vec<AgentSummary> {
        let agents = self.agents.read().await;
        let mut list: Vec<AgentSummary> = agents
            .values()
            .map(|d| AgentSummary {
                name: d.name.clone(),
                description: d.description.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Descriptor registered under exactly `name`
    pub async fn descriptor(&self, name: &str) -> Option<AgentDescriptor> {
        self.agents.read().await.get(name).cloned()
    }

    /// Number of registered agents
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Whether nothing is registered
    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

/// Path-routed equivalent of a `<sub>.localhost[:port]` address.
///
/// `http://finder.localhost:10002` becomes `http://localhost:10002/finder`.
/// Other hosts have no fallback.
pub fn fallback_address(address: &str) -> Option<String> {
    let mut url = Url::parse(address).ok()?;
    let host = url.host_str()?.to_lowercase();
    let label = host.strip_suffix(".localhost")?.split('.').next()?.to_string();
    if label.is_empty() {
        return None;
    }

    let segment = match AgentVariant::detect(&label) {
        Some(variant @ (AgentVariant::Finder | AgentVariant::Reserve)) => variant.label().to_string(),
        _ => label,
    };

    let path = format!("/{}{}", segment, url.path().trim_end_matches('/'));
    url.set_host(Some("localhost")).ok()?;
    url.set_path(&path);
    Some(url.to_string().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConciergeError;
    use crate::remote::types::{AgentCard, OutboundMessage, SendOutcome};
    use async_trait::async_trait;

    /// Serves cards by address; everything else is unreachable
    struct CardServer {
        cards: HashMap<String, &'static str>,
        /// Reachable addresses that answer with an undecodable card
        malformed: Vec<String>,
        probes: std::sync::Mutex<Vec<String>>,
    }

    impl CardServer {
        fn new(cards: &[(&str, &'static str)]) -> Self {
            Self {
                cards: cards.iter().map(|(a, n)| (a.to_string(), *n)).collect(),
                malformed: Vec::new(),
                probes: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteAgentClient for CardServer {
        async fn fetch_card(&self, address: &str) -> Result<AgentCard> {
            self.probes.lock().unwrap().push(address.to_string());
            if self.malformed.iter().any(|a| a == address) {
                let err = serde_json::from_str::<AgentCard>("{\"name\": 7}").unwrap_err();
                return Err(ConciergeError::from(err));
            }
            match self.cards.get(address) {
                Some(name) => Ok(AgentCard {
                    name: name.to_string(),
                    description: format!("{} description", name),
                    url: address.to_string(),
                    version: "1.0.0".to_string(),
                    skills: vec![],
                    registrations: vec![],
                    trust_models: vec![],
                }),
                None => Err(ConciergeError::unavailable(format!("connect refused: {}", address))),
            }
        }

        async fn send_task(&self, _endpoint: &str, _message: &OutboundMessage) -> Result<SendOutcome> {
            Err(ConciergeError::unavailable("not used"))
        }
    }

    fn travel_registry() -> (Arc<CardServer>, RemoteAgentRegistry) {
        let server = Arc::new(CardServer::new(&[
            ("http://localhost:10002/finder", "Airbnb Agent - Finder"),
            ("http://localhost:10002/reserve", "Airbnb Agent - Reserve"),
            ("http://localhost:10001", "Weather Agent"),
        ]));
        let registry = RemoteAgentRegistry::new(
            server.clone(),
            vec![
                "http://finder.localhost:10002".to_string(),
                "http://reserve.localhost:10002".to_string(),
                "http://localhost:10001".to_string(),
            ],
        );
        (server, registry)
    }

    #[test]
    fn test_fallback_address() {
        assert_eq!(
            fallback_address("http://finder.localhost:10002").as_deref(),
            Some("http://localhost:10002/finder")
        );
        assert_eq!(
            fallback_address("http://reserve.localhost:10002/").as_deref(),
            Some("http://localhost:10002/reserve")
        );
        assert_eq!(
            fallback_address("http://weather.localhost:10001").as_deref(),
            Some("http://localhost:10001/weather")
        );
        assert_eq!(fallback_address("http://localhost:10001"), None);
        assert_eq!(fallback_address("https://agents.example.com"), None);
    }

    #[tokio::test]
    async fn test_register_uses_fallback_endpoint() {
        let (server, registry) = travel_registry();
        let descriptor = registry
            .register("http://finder.localhost:10002")
            .await
            .unwrap();
        assert_eq!(descriptor.name, "Airbnb Agent - Finder");
        assert_eq!(descriptor.endpoint_url, "http://localhost:10002/finder");
        assert_eq!(server.probes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_card_is_not_retried() {
        let mut server = CardServer::new(&[("http://localhost:10002/finder", "Airbnb Agent - Finder")]);
        server.malformed.push("http://finder.localhost:10002".to_string());
        let server = Arc::new(server);
        let registry = RemoteAgentRegistry::new(server.clone(), vec![]);

        let err = registry.register("http://finder.localhost:10002").await.unwrap_err();
        assert!(matches!(err, ConciergeError::Json(_)));
        assert_eq!(*server.probes.lock().unwrap(), vec!["http://finder.localhost:10002"]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_failure_without_fallback() {
        let (server, registry) = travel_registry();
        assert!(registry.register("http://localhost:9999").await.is_err());
        assert_eq!(server.probes.lock().unwrap().len(), 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_resolve_spellings() {
        let (_, registry) = travel_registry();
        registry.refresh_if_empty().await;

        for spelling in ["Airbnb Agent - Finder", "airbnb agent - finder", "seller agent", "Finder", "finder"] {
            assert_eq!(
                registry.resolve(spelling).await.as_deref(),
                Some("Airbnb Agent - Finder"),
                "spelling {spelling:?}"
            );
        }
        assert_eq!(
            registry.resolve("booking agent").await.as_deref(),
            Some("Airbnb Agent - Reserve")
        );
        assert_eq!(registry.resolve("weather").await.as_deref(), Some("Weather Agent"));
        assert_eq!(registry.resolve("calendar").await, None);
        assert_eq!(registry.resolve("  ").await, None);
    }

    #[tokio::test]
    async fn test_alias_requires_registered_target() {
        let server = Arc::new(CardServer::new(&[("http://localhost:10001", "Weather Agent")]));
        let registry = RemoteAgentRegistry::new(server, vec!["http://localhost:10001".to_string()]);
        registry.refresh_if_empty().await;
        assert_eq!(registry.resolve("seller agent").await, None);
    }

    #[tokio::test]
    async fn test_refresh_only_when_empty() {
        let (server, registry) = travel_registry();
        assert_eq!(registry.refresh_if_empty().await, 3);
        let probes = server.probes.lock().unwrap().len();
        assert_eq!(registry.refresh_if_empty().await, 0);
        assert_eq!(server.probes.lock().unwrap().len(), probes);
        assert_eq!(
            registry.names().await,
            vec!["Airbnb Agent - Finder", "Airbnb Agent - Reserve", "Weather Agent"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_last_write_wins() {
        let server = Arc::new(CardServer::new(&[
            ("http://a.example:1", "Weather Agent"),
            ("http://b.example:2", "Weather Agent"),
        ]));
        let registry = RemoteAgentRegistry::new(server, vec![]);
        registry.register("http://a.example:1").await.unwrap();
        registry.register("http://b.example:2").await.unwrap();
        assert_eq!(registry.len().await, 1);
        let d = registry.descriptor("Weather Agent").await.unwrap();
        assert_eq!(d.endpoint_url, "http://b.example:2");
    }
}
