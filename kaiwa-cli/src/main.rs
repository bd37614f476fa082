//! kaiwa CLI - interactive chat and A2A tooling for kaiwa agents.

mod chat;
mod tools;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kaiwa::agent::Agent;
use kaiwa::provider::{AnthropicProvider, FromEnv};
use kaiwa_a2a::{A2aClient, A2aServer, AgentCard, AgentSkill};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use chat::ChatSession;

const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant with access to tools. \
    Use them when they help, and say so when they fail.";

/// kaiwa CLI - chat with agents, serve them, or ask remote ones
#[derive(Parser, Debug)]
#[command(name = "kaiwa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model name (uses the provider default if not specified)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat with a local agent and demo tools
    Chat {
        /// System prompt for the agent
        #[arg(short, long)]
        system: Option<String>,

        /// Maximum model round-trips per user turn
        #[arg(long, default_value_t = 10)]
        max_iterations: usize,

        /// Show token usage after each response
        #[arg(long)]
        usage: bool,
    },

    /// Serve a local agent over the A2A task API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,

        /// Agent name published on the card
        #[arg(long, default_value = "assistant")]
        name: String,

        /// Agent description published on the card
        #[arg(long, default_value = "A general-purpose assistant with demo tools.")]
        description: String,
    },

    /// Delegate a message to a remote A2A agent and wait for the answer
    Ask {
        /// Base URL of the remote agent (e.g. http://localhost:8000)
        url: String,

        /// The message to delegate
        message: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("kaiwa=debug,kaiwa_a2a=debug,kaiwa_cli=debug")
    } else {
        EnvFilter::new("kaiwa=warn,kaiwa_a2a=info,kaiwa_cli=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn provider(model: Option<String>) -> AnthropicProvider {
    let provider = AnthropicProvider::from_env();
    match model {
        Some(model) => provider.model(model),
        None => provider,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Chat {
            system,
            max_iterations,
            usage,
        } => {
            let agent = Agent::new("assistant")
                .instructions(system.unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()))
                .registry(tools::demo_tools())
                .max_iterations(max_iterations);

            ChatSession::new(provider(cli.model), agent)
                .show_usage(usage)
                .run()
                .await?;
        }

        Command::Serve {
            addr,
            name,
            description,
        } => {
            let card = AgentCard::new(&name, &description, format!("http://{addr}"))
                .skill(AgentSkill::new(
                    "general",
                    "General assistance",
                    "Answer questions, with weather/news/time demo tools.",
                ));
            let agent = Agent::new(&name)
                .instructions(DEFAULT_INSTRUCTIONS)
                .registry(tools::demo_tools());

            A2aServer::new(card, agent, Arc::new(provider(cli.model)))
                .serve(addr)
                .await?;
        }

        Command::Ask { url, message } => {
            let client = A2aClient::new(url).sender("kaiwa-cli");

            let card = client.discover().await?;
            println!("Agent: {} - {}", card.name, card.description);

            let task = client.ask(message).await?;
            println!(
                "[{}] {}",
                serde_json::to_string(&task.status)?.trim_matches('"'),
                task.result.unwrap_or_default()
            );
        }
    }

    Ok(())
}
