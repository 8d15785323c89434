//! # turnloop-core
//!
//! Tool-augmented chat turns with a transport-agnostic model gateway.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     HandoffRouter                            │
//! │   stage 1 ──final text──▶ stage 2 ──final text──▶ ...        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                      Agent                             │  │
//! │  │  ┌─────────────┐  ┌─────────────┐  ┌────────────────┐  │  │
//! │  │  │ Turn loop   │──│   Tool      │──│  ModelGateway  │  │  │
//! │  │  │ (state      │  │   Registry  │  │  (Strategy)    │  │  │
//! │  │  │  machine)   │  └─────────────┘  └────────────────┘  │  │
//! │  │  └─────────────┘        Conversation                   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ModelGateway` trait keeps the loop independent of any particular
//! endpoint; `turnloop-runtime` provides the HTTP implementation.

pub mod error;
pub mod gateway;
pub mod handoff;
pub mod message;
pub mod orchestrator;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use gateway::{
    Completion, CompletionRequest, CompletionStream, GenerationOptions, ModelGateway, ModelReply,
    ResponseFormat, StreamChunk, TokenUsage,
};
pub use handoff::{AgentDefinition, HandoffOutcome, HandoffRouter, StageTrace};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{
    AbortPolicy, Agent, AgentBuilder, AgentConfig, FinalReply, StreamSink, StreamingUpdate,
    ToolCallMode, ToolExecution, TurnOutcome, TurnPhase,
};
pub use session::Session;
pub use tool::{FnTool, ParameterSchema, Tool, ToolArgs, ToolCall, ToolRegistry, ToolSchema};
