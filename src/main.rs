//! Ragent - tool-orchestrating retrieval agent
//!
//! Main entry point for the CLI application.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ragent::cli::{repl::render_result, Mode, Repl};
use ragent::{server, Agent, Config};
use tracing_subscriber::EnvFilter;

/// Ragent - answers questions from a knowledge base or the web
#[derive(Parser, Debug)]
#[command(name = "ragent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Run the HTTP server
    #[arg(long, conflicts_with_all = ["prompt", "chat"])]
    serve: bool,

    /// Start the REPL in streaming chat mode
    #[arg(long)]
    chat: bool,

    /// Answering model
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Maximum model turns per question
    #[arg(long)]
    max_steps: Option<usize>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Print the result as JSON (with --prompt)
    #[arg(long)]
    json: bool,
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let default = if debug { "ragent=debug" } else { "ragent=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.models.answering = model.clone();
    }

    if let Some(max_steps) = args.max_steps {
        config.agent.max_steps = max_steps;
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }

    if args.debug {
        config.agent.debug = true;
    }

    init_tracing(config.agent.debug)?;
    config.validate().context("invalid configuration")?;

    if args.serve {
        server::serve(config).await?;
        return Ok(());
    }

    let agent = Arc::new(Agent::from_config(config)?);

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let result = agent.ask(&prompt).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", render_result(&result));
        }
        return Ok(());
    }

    // Interactive REPL mode
    let mode = if args.chat { Mode::Chat } else { Mode::Agent };
    let mut repl = Repl::new(agent, mode);
    repl.run().await?;

    Ok(())
}
