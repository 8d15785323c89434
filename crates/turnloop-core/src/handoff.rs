//! Agent Handoff
//!
//! A fixed, linear pipeline of agents. Each stage runs one turn on a fresh
//! conversation seeded with the previous stage's final answer; nothing else
//! crosses stage boundaries.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::gateway::ModelGateway;
use crate::orchestrator::{Agent, AgentConfig, StreamSink};
use crate::tool::ToolRegistry;

/// One named stage of a pipeline
#[derive(Clone)]
pub struct AgentDefinition {
    pub name: String,
    pub instructions: String,
    pub tools: Arc<ToolRegistry>,
}

impl AgentDefinition {
    /// Stage without tools
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: Arc::new(ToolRegistry::new()),
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }
}

/// What one stage received and produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageTrace {
    pub agent: String,
    pub seed: String,
    pub output: String,
    pub tool_rounds: usize,
}

/// Result of a full pipeline run
#[derive(Clone, Debug)]
pub struct HandoffOutcome {
    /// Output of the last stage
    pub final_text: String,

    /// One entry per stage, in pipeline order
    pub trace: Vec<StageTrace>,
}

/// Runs a message through a fixed sequence of agents
pub struct HandoffRouter {
    gateway: Arc<dyn ModelGateway>,
    stages: Vec<AgentDefinition>,
    base: AgentConfig,
}

impl HandoffRouter {
    /// Build a pipeline; stage names must be unique and there must be at
    /// least one stage
    pub fn new(gateway: Arc<dyn ModelGateway>, stages: Vec<AgentDefinition>) -> Result<Self> {
        if stages.is_empty() {
            return Err(AgentError::Config("pipeline has no stages".into()));
        }

        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(AgentError::DuplicateAgent(stage.name.clone()));
            }
        }

        Ok(Self {
            gateway,
            stages,
            base: AgentConfig::default(),
        })
    }

    /// Settings shared by every stage (model, round limit, timeouts). Name
    /// and instructions always come from the stage definition.
    #[must_use]
    pub fn with_base_config(mut self, config: AgentConfig) -> Self {
        self.base = config;
        self
    }

    pub fn stages(&self) -> &[AgentDefinition] {
        &self.stages
    }

    fn agent_for(&self, stage: &AgentDefinition) -> Agent {
        let config = AgentConfig {
            name: stage.name.clone(),
            instructions: stage.instructions.clone(),
            ..self.base.clone()
        };
        Agent::new(Arc::clone(&self.gateway), Arc::clone(&stage.tools), config)
    }

    /// Run every stage to completion
    pub async fn run(&self, seed: impl Into<String>) -> Result<HandoffOutcome> {
        self.drive(seed.into(), None, &CancellationToken::new()).await
    }

    /// Run every stage, giving up when `cancel` fires
    pub async fn run_with_cancel(&self, seed: impl Into<String>, cancel: &CancellationToken) -> Result<HandoffOutcome> {
        self.drive(seed.into(), None, cancel).await
    }

    /// Run every stage, streaming each agent's fragments to `sink`
    pub async fn run_streaming(
        &self,
        seed: impl Into<String>,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<HandoffOutcome> {
        self.drive(seed.into(), Some(sink), cancel).await
    }

    async fn drive(
        &self,
        seed: String,
        mut sink: Option<&mut dyn StreamSink>,
        cancel: &CancellationToken,
    ) -> Result<HandoffOutcome> {
        let mut input = seed;
        let mut trace = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let agent = self.agent_for(stage);
            let mut conversation = agent.new_conversation();
            tracing::info!(stage = %stage.name, "handoff stage started");

            let result = match sink.as_deref_mut() {
                Some(sink) => {
                    agent
                        .run_streaming(&mut conversation, input.clone(), sink, cancel)
                        .await
                }
                None => {
                    agent
                        .run_with_cancel(&mut conversation, input.clone(), cancel)
                        .await
                }
            };
            let outcome = result.map_err(|e| e.in_stage(&stage.name))?;

            let output = outcome.text();
            trace.push(StageTrace {
                agent: stage.name.clone(),
                seed: input,
                output: output.clone(),
                tool_rounds: outcome.tool_rounds,
            });
            input = output;
        }

        Ok(HandoffOutcome {
            final_text: input,
            trace,
        })
    }
}
