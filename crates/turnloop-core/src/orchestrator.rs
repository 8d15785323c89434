//! Turn Orchestrator
//!
//! Runs one user turn to completion: ask the model, execute any tools it
//! requests, feed the results back, and repeat until it produces a final
//! answer.
//!
//! ```text
//! AwaitingModel ──tool calls──▶ ExecutingTools ──results appended──┐
//!      ▲                                                           │
//!      └───────────────────────────────────────────────────────────┘
//!      │
//!      └──final text / structured value──▶ Finalized
//! ```
//!
//! The conversation grows by the user message, one tool message per executed
//! call, and the final assistant message. The model's intermediate tool-call
//! requests are not stored; each tool message carries the call it answers so
//! gateways can rebuild the exchange on the wire.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::gateway::{
    Completion, CompletionRequest, GenerationOptions, ModelGateway, ModelReply, ResponseFormat,
    TokenUsage,
};
use crate::message::{Conversation, Message, Role};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolSchema};

/// Default bound on tool-call rounds per turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

const DEFAULT_INSTRUCTIONS: &str = "You are a helpful AI assistant. \
Use the available tools when they help answer the user, then synthesize their \
results into a concise, accurate response.";

/// Where a turn was when it stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingModel,
    ExecutingTools,
    Finalized,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingModel => write!(f, "awaiting the model"),
            Self::ExecutingTools => write!(f, "executing tools"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

/// How tool calls travel between model and agent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolCallMode {
    /// Schemas go to the endpoint; it returns structured calls
    #[default]
    Native,

    /// Tools are described in the system prompt and calls are parsed from
    /// fenced ```` ```tool ```` blocks in the reply text
    Prompted,
}

/// How the calls of one round are run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolExecution {
    /// One after another, in request order
    #[default]
    Sequential,

    /// All at once; results are still recorded in request order
    Concurrent,
}

/// What happens to the conversation when a turn is cancelled or fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AbortPolicy {
    /// Restore the exact pre-turn history
    #[default]
    Rollback,

    /// Keep the user message and completed tool results, add no assistant reply
    RetainInput,
}

/// One fragment of streamed output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamingUpdate {
    /// Agent that produced the fragment
    pub agent: String,

    pub delta: String,

    /// Set on the single closing update of a turn
    pub is_final: bool,
}

impl StreamingUpdate {
    fn delta(agent: &str, delta: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            delta: delta.into(),
            is_final: false,
        }
    }

    fn end(agent: &str) -> Self {
        Self {
            agent: agent.into(),
            delta: String::new(),
            is_final: true,
        }
    }
}

/// Receiver for streamed fragments (console writer, UI channel, test buffer)
pub trait StreamSink: Send {
    fn on_fragment(&mut self, update: StreamingUpdate);
}

impl<F> StreamSink for F
where
    F: FnMut(StreamingUpdate) + Send,
{
    fn on_fragment(&mut self, update: StreamingUpdate) {
        self(update);
    }
}

/// Final answer of a turn
#[derive(Clone, Debug, PartialEq)]
pub enum FinalReply {
    Text(String),
    Structured(serde_json::Value),
}

impl std::fmt::Display for FinalReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

/// Result of a finalized turn
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: FinalReply,

    /// Tool-call rounds executed before the answer
    pub tool_rounds: usize,

    /// Token usage summed over every model call of the turn
    pub usage: Option<TokenUsage>,
}

impl TurnOutcome {
    /// The answer as text (structured replies as compact JSON)
    pub fn text(&self) -> String {
        self.reply.to_string()
    }

    /// Deserialize a structured reply (or a text reply holding JSON)
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.reply {
            FinalReply::Structured(value) => Ok(T::deserialize(value)?),
            FinalReply::Text(text) => Ok(serde_json::from_str(text)?),
        }
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Agent name, used to tag streamed output and assistant messages
    pub name: String,

    /// Instructions sent as the system prompt
    pub instructions: String,

    /// Maximum tool-call rounds before the turn fails
    pub max_tool_rounds: usize,

    /// Generation options
    pub generation: GenerationOptions,

    pub tool_call_mode: ToolCallMode,

    pub response_format: ResponseFormat,

    pub tool_execution: ToolExecution,

    pub abort_policy: AbortPolicy,

    /// Longest wait for a stream to open, and then for each next fragment
    pub fragment_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Agent".into(),
            instructions: DEFAULT_INSTRUCTIONS.into(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            generation: GenerationOptions::default(),
            tool_call_mode: ToolCallMode::default(),
            response_format: ResponseFormat::default(),
            tool_execution: ToolExecution::default(),
            abort_policy: AbortPolicy::default(),
            fragment_timeout: Duration::from_secs(60),
        }
    }
}

/// The main Agent struct
pub struct Agent {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(gateway: Arc<dyn ModelGateway>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            gateway,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(gateway: Arc<dyn ModelGateway>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(gateway, tools, AgentConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Build the full system prompt, including tool descriptions when tools
    /// are called through the prompt
    pub fn system_prompt(&self) -> String {
        let mut prompt = self.config.instructions.clone();

        if self.config.tool_call_mode == ToolCallMode::Prompted && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
            prompt.push_str(
                "After receiving tool results, synthesize them into a helpful response. \
                 If you can answer directly without tools, do so.",
            );
        }

        prompt
    }

    /// A fresh conversation seeded with this agent's system prompt
    pub fn new_conversation(&self) -> Conversation {
        Conversation::with_system_prompt(self.system_prompt())
    }

    /// Run one turn and wait for the final answer
    pub async fn run(&self, conversation: &mut Conversation, input: impl Into<String>) -> Result<TurnOutcome> {
        self.drive(conversation, input.into(), None, &CancellationToken::new())
            .await
    }

    /// Run one turn, giving up when `cancel` fires
    pub async fn run_with_cancel(
        &self,
        conversation: &mut Conversation,
        input: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.drive(conversation, input.into(), None, cancel).await
    }

    /// Run one turn, pushing text fragments to `sink` as they arrive
    pub async fn run_streaming(
        &self,
        conversation: &mut Conversation,
        input: impl Into<String>,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.drive(conversation, input.into(), Some(sink), cancel)
            .await
    }

    /// Run with a simple string input (creates temporary conversation)
    pub async fn ask(&self, question: &str) -> Result<TurnOutcome> {
        let mut conversation = self.new_conversation();
        self.run(&mut conversation, question).await
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        input: String,
        mut sink: Option<&mut dyn StreamSink>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let checkpoint = conversation.len();
        conversation.push(Message::user(input));

        let tool_schemas = match self.config.tool_call_mode {
            ToolCallMode::Native => self.tools.schemas(),
            ToolCallMode::Prompted => Vec::new(),
        };
        let mut rounds = 0;
        let mut usage: Option<TokenUsage> = None;

        loop {
            tracing::debug!(
                agent = %self.config.name,
                round = rounds + 1,
                messages = conversation.len(),
                "awaiting model"
            );

            let completion = match self
                .call_model(conversation, &tool_schemas, sink.as_deref_mut(), cancel)
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    let e = e.context(format!("model call (round {})", rounds + 1));
                    return Err(self.abandon(conversation, checkpoint, e));
                }
            };
            if let Some(u) = completion.usage {
                *usage.get_or_insert_with(TokenUsage::default) += u;
            }

            let reply = match self.interpret(completion.reply) {
                Ok(reply) => reply,
                Err(e) => {
                    let e = e.context(format!("model reply (round {})", rounds + 1));
                    return Err(self.abandon(conversation, checkpoint, e));
                }
            };

            let reply = match reply {
                ModelReply::ToolCalls(calls) => {
                    if rounds == self.config.max_tool_rounds {
                        tracing::warn!(
                            agent = %self.config.name,
                            limit = self.config.max_tool_rounds,
                            "tool-call round limit reached"
                        );
                        return Err(AgentError::ToolLoopExceeded {
                            limit: self.config.max_tool_rounds,
                            transcript: conversation.snapshot(),
                        });
                    }
                    rounds += 1;

                    if let Err(e) = self.execute_tools(conversation, calls, rounds, cancel).await {
                        return Err(self.abandon(conversation, checkpoint, e));
                    }
                    continue;
                }
                ModelReply::Text(text) => FinalReply::Text(text),
                ModelReply::Structured(value) => FinalReply::Structured(value),
            };

            conversation.push(
                Message::assistant(reply.to_string())
                    .with_name(&self.config.name)
                    .with_model(completion.model),
            );
            if let Some(sink) = sink.as_deref_mut() {
                sink.on_fragment(StreamingUpdate::end(&self.config.name));
            }
            tracing::info!(agent = %self.config.name, tool_rounds = rounds, "turn finalized");

            return Ok(TurnOutcome {
                reply,
                tool_rounds: rounds,
                usage,
            });
        }
    }

    /// Messages sent to the gateway for the current history
    fn request_messages<'c>(&self, conversation: &'c Conversation) -> Cow<'c, [Message]> {
        let prompted = self.config.tool_call_mode == ToolCallMode::Prompted;
        if conversation.has_system_prompt() && !prompted {
            return Cow::Borrowed(conversation.messages());
        }

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if !conversation.has_system_prompt() {
            messages.push(Message::system(self.system_prompt()));
        }
        messages.extend(conversation.messages().iter().map(|m| {
            if prompted && m.role == Role::Tool {
                Message::user(format_tool_result(m))
            } else {
                m.clone()
            }
        }));
        Cow::Owned(messages)
    }

    async fn call_model<'s>(
        &self,
        conversation: &Conversation,
        tools: &[ToolSchema],
        sink: Option<&mut (dyn StreamSink + 's)>,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let cancelled = || AgentError::Cancelled {
            phase: TurnPhase::AwaitingModel,
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let messages = self.request_messages(conversation);
        let request = CompletionRequest {
            messages: &messages,
            tools,
            options: &self.config.generation,
            response_format: &self.config.response_format,
        };

        let Some(sink) = sink else {
            return tokio::select! {
                biased;
                () = cancel.cancelled() => Err(cancelled()),
                completion = self.gateway.complete(&request) => completion,
            };
        };

        let open = tokio::time::timeout(self.config.fragment_timeout, self.gateway.complete_stream(&request));
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled()),
            opened = open => opened,
        };
        let mut stream = opened.map_err(|_| {
            AgentError::Transport(format!(
                "stream not opened within {:?}",
                self.config.fragment_timeout
            ))
        })??;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = None;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled()),
                next = tokio::time::timeout(self.config.fragment_timeout, stream.next()) => next,
            };
            let chunk = match next {
                Err(_) => {
                    return Err(AgentError::Transport(format!(
                        "no fragment received within {:?}",
                        self.config.fragment_timeout
                    )));
                }
                Ok(None) => break,
                Ok(Some(chunk)) => chunk?,
            };

            if !chunk.delta.is_empty() {
                text.push_str(&chunk.delta);
                sink.on_fragment(StreamingUpdate::delta(&self.config.name, chunk.delta));
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                tool_calls = chunk.tool_calls;
                break;
            }
        }

        let reply = if tool_calls.is_empty() {
            ModelReply::Text(text)
        } else {
            ModelReply::ToolCalls(tool_calls)
        };

        Ok(Completion {
            reply,
            model: self.config.generation.model.clone(),
            usage,
            finish_reason: None,
        })
    }

    /// Normalize a raw reply: pull prompted tool calls out of text, parse
    /// structured answers, and give every tool call an ID
    fn interpret(&self, reply: ModelReply) -> Result<ModelReply> {
        let reply = match reply {
            ModelReply::Text(text)
                if self.config.tool_call_mode == ToolCallMode::Prompted && !self.tools.is_empty() =>
            {
                let calls = parse_prompted_tool_calls(&text);
                if calls.is_empty() {
                    ModelReply::Text(text)
                } else {
                    ModelReply::ToolCalls(calls)
                }
            }
            ModelReply::ToolCalls(calls) if calls.is_empty() => ModelReply::Text(String::new()),
            other => other,
        };

        match reply {
            ModelReply::Text(text) if self.config.response_format.is_structured() => {
                let value = serde_json::from_str(text.trim())
                    .map_err(|e| AgentError::Parse(format!("structured reply is not valid JSON: {e}")))?;
                Ok(ModelReply::Structured(value))
            }
            ModelReply::ToolCalls(calls) => Ok(ModelReply::ToolCalls(
                calls
                    .into_iter()
                    .map(|mut call| {
                        if call.id.is_none() {
                            call.id = Some(format!("call_{}", uuid::Uuid::new_v4().simple()));
                        }
                        call
                    })
                    .collect(),
            )),
            other => Ok(other),
        }
    }

    async fn execute_tools(
        &self,
        conversation: &mut Conversation,
        calls: Vec<ToolCall>,
        round: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let cancelled = || AgentError::Cancelled {
            phase: TurnPhase::ExecutingTools,
        };

        match self.config.tool_execution {
            ToolExecution::Sequential => {
                for call in calls {
                    let output = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(cancelled()),
                        output = self.invoke_tool(&call) => output,
                    };
                    conversation.push(Message::tool(output, call).with_round(round));
                }
            }
            ToolExecution::Concurrent => {
                let outputs = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(cancelled()),
                    outputs = futures::future::join_all(calls.iter().map(|c| self.invoke_tool(c))) => outputs,
                };
                for (call, output) in calls.into_iter().zip(outputs) {
                    conversation.push(Message::tool(output, call).with_round(round));
                }
            }
        }

        Ok(())
    }

    /// Run one call; failures become text the model can react to
    async fn invoke_tool(&self, call: &ToolCall) -> String {
        match self.tools.invoke(call).await {
            Ok(output) => output,
            Err(e) if e.is_tool_recoverable() => {
                tracing::warn!(agent = %self.config.name, tool = %call.name, error = %e, "tool call failed");
                format!("Error: {e}")
            }
            Err(e) => {
                tracing::error!(
                    agent = %self.config.name,
                    tool = %call.name,
                    error = %e,
                    "tool raised an unexpected error"
                );
                format!("Error: {e}")
            }
        }
    }

    fn abandon(&self, conversation: &mut Conversation, checkpoint: usize, err: AgentError) -> AgentError {
        if let AgentError::Cancelled { phase } = &err {
            tracing::warn!(agent = %self.config.name, %phase, "turn cancelled");
        }
        if self.config.abort_policy == AbortPolicy::Rollback {
            conversation.truncate(checkpoint);
        }
        err
    }
}

/// Render a tool message for endpoints that only see plain chat turns
fn format_tool_result(message: &Message) -> String {
    let name = message.tool_call().map_or("unknown", |c| c.name.as_str());
    if message.content.starts_with("Error: ") {
        format!("[Tool '{name}' failed]\n{}", message.content)
    } else {
        format!("[Tool '{name}' returned]\n{}", message.content)
    }
}

/// Extract tool calls from fenced ```` ```tool ```` blocks, falling back to a
/// bare JSON object with a `"tool"` key
pub fn parse_prompted_tool_calls(content: &str) -> Vec<ToolCall> {
    const FENCE: &str = "```tool";
    const CLOSE: &str = "```";

    let mut calls = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(FENCE) {
        let after_marker = &rest[start + FENCE.len()..];
        let Some(end) = after_marker.find(CLOSE) else {
            break;
        };
        if let Ok(call) = serde_json::from_str::<ToolCall>(after_marker[..end].trim()) {
            calls.push(call);
        }
        rest = &after_marker[end + CLOSE.len()..];
    }

    if calls.is_empty() && content.contains(r#""tool""#) {
        if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
            if start < end {
                if let Ok(call) = serde_json::from_str::<ToolCall>(&content[start..=end]) {
                    calls.push(call);
                }
            }
        }
    }

    calls
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    gateway: Option<Arc<dyn ModelGateway>>,
    tools: Vec<Arc<dyn Tool>>,
    shared_tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Use an already-built registry, e.g. one shared between agents
    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.shared_tools = Some(tools);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = Some(temp);
        self
    }

    #[must_use]
    pub fn max_tool_rounds(mut self, max: usize) -> Self {
        self.config.max_tool_rounds = max;
        self
    }

    #[must_use]
    pub fn tool_call_mode(mut self, mode: ToolCallMode) -> Self {
        self.config.tool_call_mode = mode;
        self
    }

    #[must_use]
    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    #[must_use]
    pub fn tool_execution(mut self, execution: ToolExecution) -> Self {
        self.config.tool_execution = execution;
        self
    }

    #[must_use]
    pub fn abort_policy(mut self, policy: AbortPolicy) -> Self {
        self.config.abort_policy = policy;
        self
    }

    #[must_use]
    pub fn fragment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fragment_timeout = timeout;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let gateway = self
            .gateway
            .ok_or_else(|| AgentError::Config("Gateway is required".into()))?;

        let tools = match (self.shared_tools, self.tools.is_empty()) {
            (Some(shared), true) => shared,
            (Some(_), false) => {
                return Err(AgentError::Config(
                    "cannot add individual tools to a shared registry".into(),
                ));
            }
            (None, _) => {
                let mut registry = ToolRegistry::new();
                for tool in self.tools {
                    registry.register_arc(tool)?;
                }
                Arc::new(registry)
            }
        };

        Ok(Agent::new(gateway, tools, self.config))
    }
}
