//! Model Gateway
//!
//! Common interface to a remote chat-completion endpoint. The turn loop only
//! talks to models through this trait, so concrete transports (OpenAI-style
//! HTTP endpoints, local servers, scripted test doubles) are interchangeable.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use turnloop_core::gateway::{CompletionRequest, ModelGateway};
//!
//! let completion = gateway.complete(&request).await?;
//! match completion.reply {
//!     ModelReply::Text(text) => println!("{text}"),
//!     ModelReply::ToolCalls(calls) => { /* execute, then call again */ }
//!     ModelReply::Structured(value) => println!("{value:#}"),
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "openai/gpt-5-mini";

/// Configuration for model generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "openai/gpt-5-mini", "gpt-4o-mini", "llama3.2")
    pub model: String,

    /// Sampling temperature; endpoint default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Top-p nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            stop_sequences: Vec::new(),
        }
    }
}

/// Shape the final answer must take
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,

    /// JSON value conforming to `schema`
    JsonSchema {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self::JsonSchema {
            name: name.into(),
            description: None,
            schema,
        }
    }

    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::JsonSchema { .. })
    }
}

/// Everything a gateway needs for one model call
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    /// Conversation history, replayed in order
    pub messages: &'a [Message],

    /// Tools the model may call; empty disables function calling
    pub tools: &'a [ToolSchema],

    pub options: &'a GenerationOptions,

    pub response_format: &'a ResponseFormat,
}

/// What the model produced for one call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ModelReply {
    /// Final free-text answer
    Text(String),

    /// Final answer conforming to the requested schema
    Structured(serde_json::Value),

    /// The model wants these tools run before it answers
    ToolCalls(Vec<ToolCall>),
}

/// Response from a model completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    pub reply: ModelReply,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// A chunk from streaming completion
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// The text delta
    pub delta: String,

    /// Whether this is the final chunk
    pub done: bool,

    /// Token usage (typically only on final chunk)
    pub usage: Option<TokenUsage>,

    /// Tool calls requested by the model. Only populated on the final chunk:
    /// call fragments are not interpreted mid-stream.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl StreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            ..Default::default()
        }
    }

    pub fn finished(tool_calls: Vec<ToolCall>, usage: Option<TokenUsage>) -> Self {
        Self {
            delta: String::new(),
            done: true,
            usage,
            tool_calls,
        }
    }
}

/// Stream type for completion streaming
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Transport-agnostic access to a chat-completion model.
///
/// Implementations surface missing or rejected credentials as
/// `AgentError::Authentication` and network/endpoint failures as
/// `AgentError::Transport`. They never retry.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Short name for logs (e.g. "github-models", "ollama")
    fn name(&self) -> &str;

    /// Check if the endpoint is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Request a complete reply
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion>;

    /// Request a streamed reply, terminated by a chunk with `done` set
    async fn complete_stream(&self, request: &CompletionRequest<'_>) -> Result<CompletionStream>;
}
