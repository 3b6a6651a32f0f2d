//! Interactive REPL for Concierge
//!
//! Provides the main user interaction loop.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;

use crate::agent::{ConversationState, RoutingAgent, RoutingEvent};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::Result;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agent: RoutingAgent,
    state: ConversationState,
}

impl Repl {
    /// Create a REPL around an existing agent
    pub fn with_agent(agent: RoutingAgent) -> Self {
        Self {
            agent,
            state: ConversationState::new(),
        }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Probing remote agents...");
        io::stdout().flush()?;
        let registered = self.agent.initialize().await;
        println!(
            " {} of {} reachable\n",
            registered,
            self.agent.config().agents.addresses.len()
        );
        if registered == 0 {
            println!("No remote agents answered. They will be probed again on your first message.\n");
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            // Print prompt
            print!("You: ");
            stdout.flush()?;

            // Read input
            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();

            if input.is_empty() {
                continue;
            }

            // Handle commands
            match handle_command(input, &mut self.agent, &mut self.state).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Started a new session.\n");
                    continue;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                    continue;
                }
                Ok(CommandResult::None) => continue,
                Ok(CommandResult::Continue(input)) => self.route(&input).await,
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Route one message, printing events as they arrive
    pub async fn route(&mut self, input: &str) {
        let debug = self.agent.config().routing.debug;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent = &self.agent;
        let state = &mut self.state;

        let routing = async move {
            agent.handle(input, state, &tx).await;
        };
        let printing = async {
            while let Some(event) = rx.recv().await {
                print_event(&event, debug);
            }
        };

        tokio::join!(routing, printing);
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let config = self.agent.config();

        println!(
            r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║   Concierge                                               ║
║   Travel assistant host: stays, reservations, weather     ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#
        );
        println!("LLM:        {} ({})", config.llm.base_url, config.llm.model);
        println!("Agents:");
        for address in &config.agents.addresses {
            println!("  - {}", address);
        }
        println!("Max steps:  {}", config.routing.max_steps);
        println!();
        println!("Commands: help, agents, status, feedback, clear, exit");
        println!("───────────────────────────────────────────────────────────");
    }
}

/// Render one routing event for the terminal
fn print_event(event: &RoutingEvent, debug: bool) {
    match event {
        RoutingEvent::ToolCall { name, content } => {
            let target = content
                .get("agent_name")
                .and_then(|v| v.as_str())
                .map(|a| format!(" → {}", a))
                .unwrap_or_default();
            println!("  [{}{}]", name, target);
            if debug {
                println!("    args: {}", content);
            }
        }
        RoutingEvent::ToolResponse { name, content } => {
            let ok = content.get("status").and_then(|v| v.as_str()) != Some("error");
            println!("  {} {}", if ok { "✓" } else { "✗" }, name);
            if debug {
                println!("    result: {}", content);
            }
        }
        RoutingEvent::Final { content } => {
            println!("\nAssistant:\n{}\n", content);
        }
    }
}
