//! Remote module - the agents the host delegates to
//!
//! Wire types, the HTTP transport and the name-resolving registry.

pub mod client;
pub mod registry;
pub mod types;

pub use client::{HttpRemoteAgentClient, RemoteAgentClient, AGENT_CARD_PATH};
pub use registry::RemoteAgentRegistry;
pub use types::{AgentCard, AgentDescriptor, AgentSummary, OutboundMessage, SendOutcome, Task};
