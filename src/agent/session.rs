//! Per-conversation routing state
//!
//! Tracks which remote agent is active and the task/context ids the host
//! must echo back to each agent so it can correlate follow-ups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing state of one conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Session identifier, assigned on first use
    pub session_id: Option<Uuid>,
    /// Whether the session has been started
    pub active: bool,
    /// Name of the agent most recently sent a message
    pub active_agent: Option<String>,
    /// Task id last returned by each agent
    pub task_ids: HashMap<String, String>,
    /// Context id assigned to each agent; never changes once set
    pub context_ids: HashMap<String, String>,
}

impl ConversationState {
    /// Create an empty, inactive state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session active, assigning an id if it has none
    pub fn ensure_session(&mut self) -> Uuid {
        let id = *self.session_id.get_or_insert_with(Uuid::new_v4);
        self.active = true;
        id
    }

    /// Active agent name as shown to the model; "None" until a session
    /// has started and an agent has been addressed
    pub fn active_agent_name(&self) -> String {
        match (&self.session_id, self.active, &self.active_agent) {
            (Some(_), true, Some(name)) => name.clone(),
            _ => "None".to_string(),
        }
    }

    /// Record the agent the conversation is now talking to
    pub fn set_active_agent(&mut self, name: impl Into<String>) {
        self.active_agent = Some(name.into());
    }

    /// Task id previously returned by `agent`, if any
    pub fn task_id_for(&self, agent: &str) -> Option<&str> {
        self.task_ids.get(agent).map(String::as_str)
    }

    /// Remember the task id `agent` returned
    pub fn remember_task_id(&mut self, agent: &str, task_id: impl Into<String>) {
        self.task_ids.insert(agent.to_string(), task_id.into());
    }

    /// Context id for `agent`, created on first request
    pub fn context_id_for(&mut self, agent: &str) -> String {
        self.context_ids
            .entry(agent.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    /// Context id for `agent` without creating one
    pub fn existing_context_id(&self, agent: &str) -> Option<&str> {
        self.context_ids.get(agent).map(String::as_str)
    }
}
