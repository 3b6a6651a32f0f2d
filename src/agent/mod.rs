//! Agent module - routing loop and conversation state
//!
//! Contains the host agent that coordinates LLM calls and remote delegation.

pub mod events;
pub mod loop_state;
pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use events::RoutingEvent;
pub use loop_state::{LoopPhase, RoutingLoopState};
pub use orchestrator::{RoutingAgent, RoutingAgentBuilder};
pub use session::ConversationState;
