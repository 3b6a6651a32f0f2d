//! Custom error types for Concierge
//!
//! Provides a unified error handling system across all modules.

use serde_json::json;
use thiserror::Error;

/// Message shown to the end user when the routing loop fails outright.
pub const USER_FACING_ERROR: &str =
    "An error occurred while processing your request. Please check the server logs for details.";

/// Main error type for Concierge operations
#[derive(Error, Debug)]
pub enum ConciergeError {
    /// Requested agent name did not resolve against the registry
    #[error("Agent '{name}' not found. Available agents: {}", .allowed.join(", "))]
    AgentNotFound { name: String, allowed: Vec<String> },

    /// A remote agent, the LLM endpoint or the identity registry could not be reached
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// Identity lookup or feedback authorization could not proceed
    #[error("Identity unresolved: {0}")]
    IdentityUnresolved(String),

    /// The model produced tool arguments that are not valid JSON
    #[error("Malformed tool arguments for '{tool}': {message}")]
    MalformedToolArguments { tool: String, message: String },

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Concierge operations
pub type Result<T> = std::result::Result<T, ConciergeError>;

impl ConciergeError {
    /// Create an agent-not-found error listing the names the caller may use
    pub fn agent_not_found(name: impl Into<String>, allowed: Vec<String>) -> Self {
        Self::AgentNotFound {
            name: name.into(),
            allowed,
        }
    }

    /// Create a collaborator-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable(msg.into())
    }

    /// Create an identity error
    pub fn identity(msg: impl Into<String>) -> Self {
        Self::IdentityUnresolved(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the peer could not be reached at all (connect failure or timeout)
    pub fn is_network(&self) -> bool {
        match self {
            Self::CollaboratorUnavailable(_) => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Short machine-readable tag used in tool error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentNotFound { .. } => "agent_not_found",
            Self::CollaboratorUnavailable(_) | Self::Http(_) => "collaborator_unavailable",
            Self::IdentityUnresolved(_) => "identity_unresolved",
            Self::MalformedToolArguments { .. } => "malformed_tool_arguments",
            Self::Llm(_) => "llm",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }

    /// Render this error as the structured payload handed back to the model
    pub fn to_tool_payload(&self) -> serde_json::Value {
        let mut payload = json!({
            "status": "error",
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::AgentNotFound { allowed, .. } = self {
            payload["allowed_agents"] = json!(allowed);
        }
        payload
    }
}
