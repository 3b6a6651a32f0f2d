//! Routing agent
//!
//! Drives the bounded tool-calling loop: the model picks a remote agent,
//! the host delegates the task, and the results flow back into the
//! transcript until the model answers in plain text.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::agent::events::RoutingEvent;
use crate::agent::loop_state::RoutingLoopState;
use crate::agent::prompt::build_system_prompt;
use crate::agent::session::ConversationState;
use crate::core::{Config, Message, Result, USER_FACING_ERROR};
use crate::llm::{GenerateOptions, LLMProvider, OpenAiClient};
use crate::remote::{HttpRemoteAgentClient, RemoteAgentClient, RemoteAgentRegistry};
use crate::reputation::{DisabledIdentityRegistry, FeedbackAuthorizer, FeedbackLedger, IdentityRegistry};
use crate::tools::{ToolDispatcher, HOST_AGENT_NAME};

/// Host agent that routes user requests to remote agents
pub struct RoutingAgent {
    config: Config,
    llm: Arc<dyn LLMProvider>,
    registry: Arc<RemoteAgentRegistry>,
    authorizer: Arc<FeedbackAuthorizer>,
    ledger: Arc<FeedbackLedger>,
    dispatcher: ToolDispatcher,
}

/// Builder for [`RoutingAgent`]; unset collaborators get production defaults
pub struct RoutingAgentBuilder {
    config: Config,
    llm: Option<Arc<dyn LLMProvider>>,
    remote_client: Option<Arc<dyn RemoteAgentClient>>,
    identity: Option<Arc<dyn IdentityRegistry>>,
    ledger: Option<Arc<FeedbackLedger>>,
}

impl RoutingAgentBuilder {
    /// Create a new builder from configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            llm: None,
            remote_client: None,
            identity: None,
            ledger: None,
        }
    }

    /// Set the LLM provider
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the remote agent transport
    pub fn remote_client(mut self, client: Arc<dyn RemoteAgentClient>) -> Self {
        self.remote_client = Some(client);
        self
    }

    /// Set the identity registry
    pub fn identity(mut self, identity: Arc<dyn IdentityRegistry>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Share an existing feedback ledger
    pub fn ledger(mut self, ledger: Arc<FeedbackLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Build the agent. Remote agents are not probed until
    /// [`RoutingAgent::initialize`] or the first message.
    pub fn build(self) -> Result<RoutingAgent> {
        let llm = match self.llm {
            Some(llm) => llm,
            None => Arc::new(OpenAiClient::from_config(&self.config)?),
        };
        let remote_client = match self.remote_client {
            Some(client) => client,
            None => Arc::new(HttpRemoteAgentClient::new(self.config.agents.timeout_secs)?),
        };
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(DisabledIdentityRegistry));
        let ledger = self.ledger.unwrap_or_default();

        let registry = Arc::new(RemoteAgentRegistry::new(
            remote_client.clone(),
            self.config.agents.addresses.clone(),
        ));
        let authorizer = Arc::new(FeedbackAuthorizer::new(identity, self.config.identity.clone()));
        let dispatcher = ToolDispatcher::new(
            registry.clone(),
            remote_client,
            authorizer.clone(),
            ledger.clone(),
        );

        Ok(RoutingAgent {
            config: self.config,
            llm,
            registry,
            authorizer,
            ledger,
            dispatcher,
        })
    }
}

impl RoutingAgent {
    /// Start building an agent
    pub fn builder(config: Config) -> RoutingAgentBuilder {
        RoutingAgentBuilder::new(config)
    }

    /// Register the host's own identity (best effort) and probe the
    /// configured remote agents. Returns how many agents registered.
    pub async fn initialize(&self) -> usize {
        self.authorizer.ensure_host_identity(HOST_AGENT_NAME).await;

        let registered = self
            .registry
            .register_all(&self.config.agents.addresses)
            .await;
        info!(
            registered,
            configured = self.config.agents.addresses.len(),
            "Remote agents initialized"
        );
        registered
    }

    /// Route one user message, streaming events into `events`.
    ///
    /// Always ends with exactly one `final` event; failures of the loop
    /// itself are logged and replaced by a generic message.
    pub async fn handle(
        &self,
        text: &str,
        state: &mut ConversationState,
        events: &UnboundedSender<RoutingEvent>,
    ) {
        let content = match self.run_loop(text, state, events).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, session = ?state.session_id, "Routing loop failed");
                USER_FACING_ERROR.to_string()
            }
        };
        let _ = events.send(RoutingEvent::Final { content });
    }

    /// Route one user message and collect every event
    pub async fn respond(&self, text: &str, state: &mut ConversationState) -> Vec<RoutingEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.handle(text, state, &tx).await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    async fn run_loop(
        &self,
        text: &str,
        state: &mut ConversationState,
        events: &UnboundedSender<RoutingEvent>,
    ) -> Result<String> {
        let session = state.ensure_session();
        self.registry.refresh_if_empty().await;

        let system_prompt = build_system_prompt(
            self.config.routing.system_prompt.as_deref(),
            &self.registry.list_all().await,
            &state.active_agent_name(),
        );
        let mut messages = vec![Message::system(system_prompt), Message::user(text)];
        let mut loop_state = RoutingLoopState::new(self.config.routing.max_steps);
        let options = GenerateOptions {
            temperature: self.config.llm.temperature,
            ..Default::default()
        };

        debug!(%session, max_steps = loop_state.max_steps, "Starting routing loop");

        while loop_state.should_continue() {
            let tools = ToolDispatcher::definitions(&self.registry.names().await);
            let response = self
                .llm
                .chat_with_tools(&self.config.llm.model, &messages, &tools, Some(options.clone()))
                .await?;

            loop_state.record_model_answer(&response.content, response.has_tool_calls());
            if !response.has_tool_calls() {
                break;
            }

            debug!(
                step = loop_state.step,
                calls = response.tool_calls.len(),
                "Executing tool calls"
            );
            messages.push(Message::assistant_with_tools(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let _ = events.send(RoutingEvent::ToolCall {
                    name: call.name.clone(),
                    content: call.arguments.clone(),
                });

                let result = self.dispatcher.execute(call, state).await;
                messages.push(Message::tool(call, result.content_string()));

                let _ = events.send(RoutingEvent::ToolResponse {
                    name: call.name.clone(),
                    content: result.content,
                });
            }

            loop_state.tools_done();
        }

        if loop_state.exhausted() {
            warn!(%session, max_steps = loop_state.max_steps, "Step budget exhausted");
        }
        Ok(loop_state.into_answer())
    }

    /// Remote agent registry
    pub fn registry(&self) -> &Arc<RemoteAgentRegistry> {
        &self.registry
    }

    /// Feedback ledger
    pub fn ledger(&self) -> &Arc<FeedbackLedger> {
        &self.ledger
    }

    /// Feedback authorizer
    pub fn authorizer(&self) -> &Arc<FeedbackAuthorizer> {
        &self.authorizer
    }

    /// Name of the LLM provider in use
    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    /// Get current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the routing model
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.llm.model = model.into();
    }

    /// Set the step budget
    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.config.routing.max_steps = max_steps;
    }

    /// Enable debug mode
    pub fn set_debug(&mut self, debug: bool) {
        self.config.routing.debug = debug;
    }
}
