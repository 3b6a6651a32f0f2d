//! Tools module - the functions the routing model can call
//!
//! `send_message` delegates to remote agents; the feedback tools record
//! ratings and manage feedback authorization.

pub mod dispatcher;
pub mod feedback;
pub mod send_message;

pub use dispatcher::ToolDispatcher;
pub use feedback::{rating_percent, HOST_AGENT_NAME};
