//! Concierge - routing host for a multi-agent travel assistant
//!
//! Main entry point for the CLI application.

use std::sync::Arc;

use clap::Parser;
use concierge::agent::{ConversationState, RoutingAgent};
use concierge::{Config, Repl};
use tracing_subscriber::EnvFilter;

/// Concierge - routes travel requests to remote agents
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Routing model
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Remote agent base address; repeat to probe several
    #[arg(long = "agent", short = 'a')]
    agents: Vec<String>,

    /// Maximum model calls per message
    #[arg(long)]
    max_steps: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Serve the HTTP interface instead of the REPL
    #[arg(long)]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }

    if !args.agents.is_empty() {
        config.agents.addresses = args.agents.clone();
    }

    if let Some(max_steps) = args.max_steps {
        config.routing.max_steps = max_steps;
    }

    if args.debug {
        config.routing.debug = true;
    }

    let default_level = if config.routing.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; requests to the LLM endpoint may be rejected");
    }

    let agent = RoutingAgent::builder(config).build()?;

    if args.serve {
        agent.initialize().await;
        concierge::server::serve(Arc::new(agent)).await?;
        return Ok(());
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        agent.initialize().await;
        let mut state = ConversationState::new();
        for event in agent.respond(&prompt, &mut state).await {
            println!("{}", serde_json::to_string(&event)?);
        }
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::with_agent(agent);
    repl.run().await?;

    Ok(())
}
