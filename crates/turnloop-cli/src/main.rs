//! turnloop console
//!
//! Runs the travel scenarios, an interactive chat, or the FrontDesk →
//! Concierge handoff against an OpenAI-compatible endpoint. Streamed answers
//! go to stdout; logs go to stderr.

mod handlers;
mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use travel_samples::SampleError;
use turnloop_core::AgentError;
use turnloop_core::orchestrator::DEFAULT_MAX_TOOL_ROUNDS;

use crate::state::AppState;

/// Tool-calling agent turns from the terminal
#[derive(Parser, Debug)]
#[command(name = "turnloop", version, about)]
pub struct Cli {
    /// Model identifier (overrides GH_MODEL_ID / OLLAMA_MODEL)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint (overrides GH_ENDPOINT)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Use a local Ollama server instead of GitHub Models
    #[arg(long, global = true)]
    pub ollama: bool,

    /// Tool-call rounds allowed per turn
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_TOOL_ROUNDS)]
    pub max_tool_rounds: usize,

    /// Print each answer once it is complete instead of streaming it
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Describe tools in the system prompt for models without native
    /// function calling
    #[arg(long, global = true)]
    pub prompted_tools: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sample scenario end to end
    Scenario {
        /// Scenario name (see `turnloop list`)
        name: String,
    },

    /// Interactive chat with the travel agent
    Chat {
        /// Scenario whose agent and tools to chat with
        #[arg(long, default_value = "tool-use")]
        scenario: String,

        /// Resume a saved session
        #[arg(long, value_name = "FILE")]
        resume: Option<PathBuf>,

        /// Save the session after every turn
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },

    /// Run the FrontDesk → Concierge pipeline on a message
    Handoff {
        /// First message of the pipeline
        #[arg(default_value = travel_samples::HANDOFF_SEED)]
        seed: String,
    },

    /// List the sample scenarios
    List,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", user_message(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Commands::List) {
        handlers::list();
        return Ok(());
    }

    let state = AppState::from_cli(&cli)?;
    match cli.command {
        Commands::Scenario { name } => handlers::scenario(&state, &name).await,
        Commands::Chat {
            scenario,
            resume,
            save,
        } => handlers::chat(&state, &scenario, resume.as_deref(), save.as_deref()).await,
        Commands::Handoff { seed } => handlers::handoff(&state, &seed).await,
        Commands::List => Ok(()),
    }
}

fn user_message(e: &anyhow::Error) -> String {
    if let Some(agent) = e.downcast_ref::<AgentError>() {
        agent.user_message()
    } else if let Some(sample) = e.downcast_ref::<SampleError>() {
        sample.user_message()
    } else {
        format!("{e:#}")
    }
}
