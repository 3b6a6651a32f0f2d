//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{json, Value};

use concierge::agent::RoutingAgent;
use concierge::core::{AgentVariant, ConciergeError, Message, Result, ToolCall, ToolDefinition};
use concierge::llm::{GenerateOptions, LLMProvider, LLMResponse};
use concierge::remote::types::{AgentCard, OutboundMessage, SendOutcome, Task};
use concierge::remote::RemoteAgentClient;
use concierge::reputation::{AgentIdentity, AuthorizationReceipt, IdentityRegistry, SigningKey};
use concierge::Config;

pub const FINDER: &str = "Airbnb Agent - Finder";
pub const RESERVE: &str = "Airbnb Agent - Reserve";
pub const WEATHER: &str = "Weather Agent";

/// One recorded model request
#[derive(Clone)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Replays queued answers; falls back to `repeat` once the queue is empty
#[derive(Default)]
pub struct ScriptedProvider {
    answers: Mutex<VecDeque<Result<LLMResponse>>>,
    repeat: Option<LLMResponse>,
    hooks: Mutex<HashMap<usize, Hook>>,
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new(answers: Vec<LLMResponse>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    pub fn repeating(answer: LLMResponse) -> Self {
        Self {
            repeat: Some(answer),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            answers: Mutex::new(VecDeque::from([Err(ConciergeError::unavailable(
                "LLM endpoint refused connection",
            ))])),
            ..Default::default()
        }
    }

    pub fn push(&self, answer: LLMResponse) {
        self.answers.lock().unwrap().push_back(Ok(answer));
    }

    /// Run `hook` once the `index`-th request (0-based) has been recorded,
    /// before its answer is returned
    pub fn on_call<F>(&self, index: usize, hook: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.hooks.lock().unwrap().insert(index, Box::new(hook));
    }

    pub fn request(&self, index: usize) -> ModelRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_with_tools(
        &self,
        _model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(ModelRequest {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
            });
            requests.len() - 1
        };
        let hook = self.hooks.lock().unwrap().remove(&index);
        if let Some(hook) = hook {
            hook().await;
        }
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| ConciergeError::llm("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Remote agents served on path-routed localhost addresses.
///
/// `<sub>.localhost` hosts are unreachable so registration goes through the
/// fallback address. Every send answers with a task whose id is `task-<n>`
/// for the n-th agent contacted, unless the endpoint is marked as chatty.
pub struct FakeAgents {
    cards: HashMap<String, String>,
    chatty: HashSet<String>,
    task_ids: Mutex<HashMap<String, String>>,
    pub sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl FakeAgents {
    pub fn travel() -> Self {
        let cards = [
            ("http://localhost:10002/finder", FINDER),
            ("http://localhost:10002/reserve", RESERVE),
            ("http://localhost:10001", WEATHER),
        ];
        Self {
            cards: cards
                .iter()
                .map(|(a, n)| (a.to_string(), n.to_string()))
                .collect(),
            chatty: HashSet::new(),
            task_ids: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Serve one more card at `address`
    pub fn with_card(mut self, address: &str, name: &str) -> Self {
        self.cards.insert(address.to_string(), name.to_string());
        self
    }

    /// Answer sends to `endpoint` with a plain message instead of a task
    pub fn chatty(mut self, endpoint: &str) -> Self {
        self.chatty.insert(endpoint.to_string());
        self
    }

    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

pub fn travel_addresses() -> Vec<String> {
    vec![
        "http://finder.localhost:10002".to_string(),
        "http://reserve.localhost:10002".to_string(),
        "http://localhost:10001".to_string(),
    ]
}

#[async_trait]
impl RemoteAgentClient for FakeAgents {
    async fn fetch_card(&self, address: &str) -> Result<AgentCard> {
        let name = self
            .cards
            .get(address)
            .ok_or_else(|| ConciergeError::unavailable(format!("connection refused: {}", address)))?;
        Ok(AgentCard {
            name: name.clone(),
            description: format!("{} for the travel demo", name),
            url: address.to_string(),
            version: "1.0.0".to_string(),
            skills: vec![],
            registrations: vec![],
            trust_models: vec![],
        })
    }

    async fn send_task(&self, endpoint: &str, message: &OutboundMessage) -> Result<SendOutcome> {
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.to_string(), message.clone()));

        if self.chatty.contains(endpoint) {
            return Ok(SendOutcome::Message(json!({
                "kind": "message",
                "parts": [{"kind": "text", "text": "hello"}]
            })));
        }

        let mut task_ids = self.task_ids.lock().unwrap();
        let next = format!("task-{}", task_ids.len() + 1);
        let id = task_ids.entry(endpoint.to_string()).or_insert(next).clone();
        Ok(SendOutcome::Task(Task {
            id,
            context_id: message.context_id.clone(),
            status: json!({"state": "completed"}),
            artifacts: vec![json!({"parts": [{"kind": "text", "text": "3 rooms found"}]})],
            history: vec![],
            kind: "task".to_string(),
        }))
    }
}

/// Identity registry with fixed ids: assistant 1, finder 2, reserve 3
#[derive(Default)]
pub struct FakeIdentity {
    pub authorize_calls: AtomicUsize,
    pub ensure_calls: Mutex<Vec<(String, String)>>,
    pub receipt_auth_id: Option<String>,
    pub view_auth_id: Option<String>,
}

impl FakeIdentity {
    pub fn authorizations(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }
}

pub fn address_of(agent_id: u64) -> String {
    format!("0x{:040}", agent_id)
}

#[async_trait]
impl IdentityRegistry for FakeIdentity {
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
            address: address_of(agent_id),
        }))
    }

    async fn authorize_feedback(
        &self,
        client_id: u64,
        server_id: u64,
        _signer: &SigningKey,
    ) -> Result<Option<AuthorizationReceipt>> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(AuthorizationReceipt {
            tx_hash: format!("0xtx-{}-{}", client_id, server_id),
            feedback_auth_id: self.receipt_auth_id.clone(),
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

    async fn feedback_auth_id(&self, _client_id: u64, _server_id: u64) -> Result<Option<String>> {
        Ok(self.view_auth_id.clone())
    }
}

pub fn test_config(max_steps: usize) -> Config {
    let mut config = Config::default();
    config.agents.addresses = travel_addresses();
    config.routing.max_steps = max_steps;
    config.routing.system_prompt = None;
    config.identity.chain_id = "11155111".to_string();
    config.identity.domains.assistant = "assistant.localhost:8083".to_string();
    config.identity.domains.finder = "finder.localhost:10002".to_string();
    config.identity.domains.reserve = "reserve.localhost:10002".to_string();
    config.identity.domains.weather = "weather.localhost:10001".to_string();
    config.identity.keys = Default::default();
    config.identity.keys.default = Some("0xfeedface".to_string());
    config
}

pub struct Harness {
    pub agent: RoutingAgent,
    pub model: Arc<ScriptedProvider>,
    pub agents: Arc<FakeAgents>,
    pub identity: Arc<FakeIdentity>,
}

pub fn harness_with(
    config: Config,
    model: ScriptedProvider,
    agents: FakeAgents,
    identity: FakeIdentity,
) -> Harness {
    let model = Arc::new(model);
    let agents = Arc::new(agents);
    let identity = Arc::new(identity);
    let agent = RoutingAgent::builder(config)
        .llm(model.clone())
        .remote_client(agents.clone())
        .identity(identity.clone())
        .build()
        .unwrap();
    Harness {
        agent,
        model,
        agents,
        identity,
    }
}

pub fn harness(model: ScriptedProvider) -> Harness {
    harness_with(test_config(10), model, FakeAgents::travel(), FakeIdentity::default())
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

pub fn send(id: &str, agent_name: &str, task: &str) -> LLMResponse {
    LLMResponse::with_tool_calls(
        "",
        vec![call(id, "send_message", json!({"agent_name": agent_name, "task": task}))],
    )
}
