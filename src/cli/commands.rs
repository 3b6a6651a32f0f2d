//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::{ConversationState, RoutingAgent};
use crate::core::Result;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// A new session was started
    Clear,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub async fn handle_command(
    input: &str,
    agent: &mut RoutingAgent,
    state: &mut ConversationState,
) -> Result<CommandResult> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(CommandResult::None);
    }
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].trim_start_matches('/').to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => {
            *state = ConversationState::new();
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "agents" => {
            let agents = agent.registry().list_all().await;
            if agents.is_empty() {
                return Ok(CommandResult::Handled(
                    "No remote agents registered. Try 'refresh'.".to_string(),
                ));
            }
            let lines = agents
                .iter()
                .map(|a| format!("  - {}: {}", a.name, a.description))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandResult::Handled(format!("Remote agents:\n{}", lines)))
        }

        "refresh" => {
            agent.registry().clear().await;
            let registered = agent.registry().refresh_if_empty().await;
            Ok(CommandResult::Handled(format!(
                "Registered {} of {} configured agents",
                registered,
                agent.registry().addresses().len()
            )))
        }

        "feedback" => {
            let json = agent.ledger().to_json().await?;
            Ok(CommandResult::Handled(json))
        }

        "config" => {
            let rendered = toml::to_string_pretty(agent.config())
                .unwrap_or_else(|e| format!("# Error rendering config: {}", e));
            Ok(CommandResult::Handled(format!(
                "# {}\n{}",
                crate::core::Config::config_file().display(),
                rendered
            )))
        }

        "set" => handle_set_command(args, agent),

        "status" => {
            let config = agent.config();
            let status = format!(
                "Concierge Status:\n\
                 ─────────────────────────────\n\
                 Provider:     {}\n\
                 Model:        {}\n\
                 Max steps:    {}\n\
                 Agents:       {}\n\
                 Session:      {}\n\
                 Active agent: {}\n\
                 Identity:     {}\n\
                 Feedback:     {} records\n\
                 Debug:        {}",
                agent.provider_name(),
                config.llm.model,
                config.routing.max_steps,
                agent.registry().len().await,
                state
                    .session_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "not started".to_string()),
                state.active_agent_name(),
                if agent.authorizer().is_enabled() {
                    "enabled"
                } else {
                    "disabled"
                },
                agent.ledger().len().await,
                if config.routing.debug { "on" } else { "off" }
            );
            Ok(CommandResult::Handled(status))
        }

        "debug" => {
            let new_state = !agent.config().routing.debug;
            agent.set_debug(new_state);
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if new_state { "ON" } else { "OFF" }
            )))
        }

        _ => {
            // Not a command, treat as normal input
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Handle 'set' subcommands
fn handle_set_command(args: &str, agent: &mut RoutingAgent) -> Result<CommandResult> {
    let parts: Vec<&str> = args.splitn(2, ' ').collect();

    if parts.is_empty() || parts[0].is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: set <model|max-steps|debug> <value>\n\
             Examples:\n\
               set model gpt-4o\n\
               set max-steps 6\n\
               set debug on"
                .to_string(),
        ));
    }

    let key = parts[0].to_lowercase();
    let value = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match key.as_str() {
        "model" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current model: {}",
                    agent.config().llm.model
                )));
            }
            agent.set_model(value);
            Ok(CommandResult::Handled(format!("Model set to: {}", value)))
        }

        "max-steps" | "max_steps" | "steps" => match value.parse::<usize>() {
            Ok(steps) if steps > 0 => {
                agent.set_max_steps(steps);
                Ok(CommandResult::Handled(format!("Max steps set to: {}", steps)))
            }
            _ => Ok(CommandResult::Handled(format!(
                "Max steps must be a positive integer (current: {})",
                agent.config().routing.max_steps
            ))),
        },

        "debug" => {
            let enabled = matches!(value.to_lowercase().as_str(), "on" | "true" | "1" | "yes");
            agent.set_debug(enabled);
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if enabled { "ON" } else { "OFF" }
            )))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown setting: {}. Available: model, max-steps, debug",
            key
        ))),
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Concierge Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Concierge
  clear, reset     Start a new session
  status           Show current configuration and session
  agents           List registered remote agents
  refresh          Re-probe the configured agent addresses
  feedback         Print recorded feedback as JSON
  config           Show the effective configuration
  debug            Toggle debug mode

  set model <name>         Set the routing model
  set max-steps <n>        Set the per-message step budget
  set debug <on|off>       Enable/disable debug output

Keyboard Shortcuts:
  Ctrl+D           Exit Concierge

Tips:
  - Ask for a place to stay, a reservation or the weather
  - Follow-ups go to the currently active agent
  - Rate an agent with e.g. "give the finder 5 stars"
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, ConciergeError, Message, ToolDefinition};
    use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};
    use crate::remote::{AgentCard, OutboundMessage, RemoteAgentClient, SendOutcome};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SilentModel;

    #[async_trait]
    impl LLMProvider for SilentModel {
        async fn chat_with_tools(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse::text(""))
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    struct NoAgents;

    #[async_trait]
    impl RemoteAgentClient for NoAgents {
        async fn fetch_card(&self, address: &str) -> Result<AgentCard> {
            Err(ConciergeError::unavailable(address.to_string()))
        }

        async fn send_task(&self, endpoint: &str, _message: &OutboundMessage) -> Result<SendOutcome> {
            Err(ConciergeError::unavailable(endpoint.to_string()))
        }
    }

    fn agent() -> RoutingAgent {
        RoutingAgent::builder(Config::default())
            .llm(Arc::new(SilentModel))
            .remote_client(Arc::new(NoAgents))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_commands() {
        let mut agent = agent();
        let mut state = ConversationState::new();

        handle_command("set model gpt-4o", &mut agent, &mut state).await.unwrap();
        assert_eq!(agent.config().llm.model, "gpt-4o");

        handle_command("set max-steps 3", &mut agent, &mut state).await.unwrap();
        assert_eq!(agent.config().routing.max_steps, 3);

        handle_command("set max-steps zero", &mut agent, &mut state).await.unwrap();
        assert_eq!(agent.config().routing.max_steps, 3);
    }

    #[tokio::test]
    async fn test_clear_starts_new_session() {
        let mut agent = agent();
        let mut state = ConversationState::new();
        state.ensure_session();
        state.set_active_agent("Weather Agent");

        let result = handle_command("clear", &mut agent, &mut state).await.unwrap();
        assert_eq!(result, CommandResult::Clear);
        assert!(state.session_id.is_none());
        assert_eq!(state.active_agent_name(), "None");
    }

    #[tokio::test]
    async fn test_plain_text_continues() {
        let mut agent = agent();
        let mut state = ConversationState::new();
        let result = handle_command("find a room in LA", &mut agent, &mut state)
            .await
            .unwrap();
        assert_eq!(result, CommandResult::Continue("find a room in LA".to_string()));

        let result = handle_command("/bogus", &mut agent, &mut state).await.unwrap();
        assert!(matches!(result, CommandResult::Handled(msg) if msg.contains("Unknown command")));
    }

    #[tokio::test]
    async fn test_feedback_export_starts_empty() {
        let mut agent = agent();
        let mut state = ConversationState::new();
        let result = handle_command("feedback", &mut agent, &mut state).await.unwrap();
        assert_eq!(result, CommandResult::Handled("[]".to_string()));
    }
}
