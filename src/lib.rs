//! Concierge - routing host for a multi-agent travel assistant
//!
//! Receives a user's message, lets an LLM decide which remote agent (an
//! Airbnb finder, an Airbnb reserve agent, a weather agent) should handle it,
//! delegates over a JSON-RPC task protocol and records reputation feedback.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with an OpenAI-compatible client
//! - **Remote**: Remote agent wire types, transport and registry
//! - **Reputation**: Identity registry seam, feedback authorization, ledger
//! - **Tools**: `send_message`, `leave_feedback`, `authorize_feedback`
//! - **Agent**: The bounded routing loop and per-conversation state
//! - **CLI** / **Server**: REPL and HTTP surfaces
//!
//! # Usage
//!
//! ```rust,no_run
//! use concierge::agent::{ConversationState, RoutingAgent};
//! use concierge::Config;
//!
//! #[tokio::main]
//! async fn main() -> concierge::Result<()> {
//!     let agent = RoutingAgent::builder(Config::load()).build()?;
//!     agent.initialize().await;
//!
//!     let mut state = ConversationState::new();
//!     for event in agent.respond("Find a room in LA for 2 nights", &mut state).await {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod remote;
pub mod reputation;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::{ConversationState, RoutingAgent, RoutingEvent};
pub use cli::Repl;
pub use core::{Config, ConciergeError, Result};
