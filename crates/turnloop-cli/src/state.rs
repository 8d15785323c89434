//! Application State

use std::sync::Arc;

use travel_samples::tools::Preferences;
use turnloop_core::{AgentConfig, ModelGateway, ToolCallMode};
use turnloop_runtime::{GatewayConfig, OpenAiCompatibleGateway};

use crate::Cli;

/// Everything a command needs, built once from flags and environment
#[derive(Clone)]
pub struct AppState {
    /// Model endpoint (GitHub Models, OpenAI, Ollama)
    pub gateway: Arc<dyn ModelGateway>,

    /// Model and loop settings shared by every agent
    pub base: AgentConfig,

    /// Preferences saved by the travel agent during this process
    pub preferences: Preferences,

    /// Stream fragments to stdout as they arrive
    pub stream: bool,
}

impl AppState {
    pub fn from_cli(cli: &Cli) -> turnloop_core::Result<Self> {
        let mut config = if cli.ollama {
            GatewayConfig::ollama()
        } else {
            GatewayConfig::from_env()
        };
        if let Some(endpoint) = &cli.endpoint {
            config = config.with_endpoint(endpoint.as_str());
        }
        if let Some(model) = &cli.model {
            config = config.with_model(model.as_str());
        }
        tracing::debug!(?config, "gateway configuration");

        let mut base = AgentConfig::default();
        base.generation.model.clone_from(&config.model);
        base.max_tool_rounds = cli.max_tool_rounds;
        if cli.prompted_tools {
            base.tool_call_mode = ToolCallMode::Prompted;
        }

        let gateway = OpenAiCompatibleGateway::new(config)?;
        Ok(Self {
            gateway: Arc::new(gateway),
            base,
            preferences: Preferences::new(),
            stream: !cli.no_stream,
        })
    }
}
