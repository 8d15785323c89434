//! # turnloop-runtime
//!
//! HTTP model gateway for turnloop.
//!
//! ## Endpoints
//!
//! - **GitHub Models** (default): `GH_TOKEN` bearer auth against
//!   `https://models.github.ai/inference`
//! - **OpenAI**: set `GH_ENDPOINT=https://api.openai.com/v1`
//! - **Ollama**: `GatewayConfig::ollama()`, no credential
//!
//! ## Usage
//!
//! ```rust,ignore
//! use turnloop_runtime::{GatewayConfig, OpenAiCompatibleGateway};
//!
//! let gateway = OpenAiCompatibleGateway::new(GatewayConfig::from_env())?;
//! let agent = AgentBuilder::new()
//!     .gateway(Arc::new(gateway))
//!     .build()?;
//! ```

pub mod config;
pub mod http;
pub mod openai;

pub use config::GatewayConfig;
pub use openai::OpenAiCompatibleGateway;

// Re-export core types for convenience
pub use turnloop_core::{
    Agent, AgentBuilder, AgentError, Conversation, Message, ModelGateway, Result, Role, Session, Tool,
    ToolRegistry,
};
