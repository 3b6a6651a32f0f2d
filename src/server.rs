//! HTTP surface
//!
//! Streams routing events over SSE and serves the host's agent card, the
//! feedback export and the identities of the Airbnb agents.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::agent::{ConversationState, RoutingAgent};
use crate::core::{AgentVariant, Config, Result};
use crate::reputation::AgentIdentity;

/// Header carrying the session id of a chat stream
pub const SESSION_HEADER: &str = "x-session-id";

struct SessionSlot {
    state: Arc<Mutex<ConversationState>>,
    last_used: Instant,
}

/// Conversation state per session id.
///
/// Sessions idle for longer than the TTL are dropped whenever a session is
/// looked up, unless a request is still using them.
pub struct SessionStore {
    slots: Mutex<HashMap<String, SessionSlot>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// State for `id`, created on first use
    pub async fn get_or_create(&self, id: &str) -> Arc<Mutex<ConversationState>> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;

        let before = slots.len();
        slots.retain(|key, slot| {
            key == id
                || Arc::strong_count(&slot.state) > 1
                || now.duration_since(slot.last_used) < self.idle_ttl
        });
        if slots.len() < before {
            debug!(evicted = before - slots.len(), "Dropped idle sessions");
        }

        let slot = slots.entry(id.to_string()).or_insert_with(|| SessionSlot {
            state: Arc::default(),
            last_used: now,
        });
        slot.last_used = now;
        slot.state.clone()
    }

    /// State for `id` if the session exists
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<ConversationState>>> {
        self.slots.lock().await.get(id).map(|slot| slot.state.clone())
    }

    /// End a session. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.slots.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    agent: Arc<RoutingAgent>,
    sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(agent: Arc<RoutingAgent>) -> Self {
        let ttl = Duration::from_secs(agent.config().server.session_ttl_secs);
        Self {
            agent,
            sessions: Arc::new(SessionStore::new(ttl)),
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/agents", get(agents))
        .route("/sessions/:id", get(session_state).delete(end_session))
        .route("/.well-known/agent-card.json", get(agent_card))
        .route("/.well-known/feedback.json", get(feedback))
        .route("/.well-known/agent-ids", get(agent_ids))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(agent: Arc<RoutingAgent>) -> Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        agent.config().server.host,
        agent.config().server.port
    )
    .parse()
    .map_err(|e| crate::core::ConciergeError::config(format!("Invalid listen address: {}", e)))?;

    let app = router(AppState::new(agent));

    info!("Concierge HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Route one message; events stream back as SSE `data:` lines.
///
/// Requests for the same session run one at a time.
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    if request.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "message must not be empty").into_response();
    }

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let session = state.sessions.get_or_create(&session_id).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let agent = state.agent.clone();
    let message = request.message;
    tokio::spawn(async move {
        let mut conversation = session.lock_owned().await;
        agent.handle(&message, &mut conversation, &tx).await;
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| Event::default().json_data(event));
    (
        [(SESSION_HEADER, session_id)],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

async fn agents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.agent.registry().list_all().await)
}

async fn session_state(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sessions.get(&id).await {
        Some(session) => Json(session.lock().await.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn end_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&id).await {
        info!(session = %id, "Session ended");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn feedback(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.agent.ledger().snapshot().await)
}

async fn lookup(state: &AppState, variant: AgentVariant) -> Option<AgentIdentity> {
    let authorizer = state.agent.authorizer();
    let domain = authorizer.config().domains.for_variant(variant).to_string();
    match authorizer.resolve_domain(&domain).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(%domain, error = %e, "Identity lookup failed");
            None
        }
    }
}

async fn agent_ids(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "finder": lookup(&state, AgentVariant::Finder).await,
        "reserve": lookup(&state, AgentVariant::Reserve).await,
    }))
}

async fn agent_card(State(state): State<AppState>) -> impl IntoResponse {
    let identity = lookup(&state, AgentVariant::Assistant).await;
    Json(host_card(state.agent.config(), identity.as_ref()))
}

/// Agent card of this host
pub fn host_card(config: &Config, identity: Option<&AgentIdentity>) -> Value {
    let app_url = config.public_url();
    let mut card = json!({
        "name": "assistant",
        "description": "Travel assistant for finding and booking stays and checking weather",
        "url": app_url,
        "version": env!("CARGO_PKG_VERSION"),
        "defaultInputModes": ["text", "text/plain"],
        "defaultOutputModes": ["text", "text/plain"],
        "capabilities": {"streaming": true},
        "skills": [{
            "id": "assistant",
            "name": "Travel assistant",
            "description": "Find and reserve places to stay and check weather",
            "tags": ["finder", "reserve", "weather"],
            "examples": ["Find a place in LA and reserve it, then check weather"]
        }],
        "FeedbackDataURI": format!("{}/.well-known/feedback.json", app_url),
    });
    if let Some(identity) = identity {
        card["registrations"] = json!([{
            "agentId": identity.agent_id,
            "agentAddress": format!("eip155:{}:{}", config.identity.chain_id, identity.address),
        }]);
    }
    card
}
