//! System prompt for the routing model

use crate::remote::AgentSummary;

/// Built-in routing instructions
pub const ROUTING_INSTRUCTIONS: &str = r#"You are an expert Routing Delegator. Your job is to route user requests to remote agents using the send_message tool, and then present the remote agent's result to the user. Rely on tools only; do not fabricate results.

## Tools
- `send_message`: delegate a task to one remote agent. Pass the agent's exact name and a self-contained task description including everything the agent needs from the conversation.
- `leave_feedback`: record the user's rating (1-5) and comment about a remote agent.
- `authorize_feedback`: authorize a client agent to leave feedback about a target agent. `leave_feedback` does this automatically when needed.

## Rules
- Keep talking to the currently active agent for follow-ups about the same task.
- If a tool returns an error, explain it to the user or try a different agent; never invent a result."#;

/// Build the system prompt from the live agent list and the active agent
pub fn build_system_prompt(
    instructions: Option<&str>,
    agents: &[AgentSummary],
    active_agent: &str,
) -> String {
    let agent_lines = agents
        .iter()
        .filter_map(|a| serde_json::to_string(a).ok())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nAvailable Agents:\n{}\n\nCurrently Active Agent: {}",
        instructions.unwrap_or(ROUTING_INSTRUCTIONS),
        agent_lines,
        active_agent
    )
}
