//! Error Types

use thiserror::Error;

use crate::message::Message;
use crate::orchestrator::TurnPhase;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network or endpoint failure during a model call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Tool call referenced a name that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool name registered twice
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Agent name used twice in one pipeline
    #[error("Agent already present in pipeline: {0}")]
    DuplicateAgent(String),

    /// Tool argument failed schema validation
    #[error("Invalid argument '{parameter}' for tool '{tool}': {reason}")]
    InvalidArgument {
        tool: String,
        parameter: String,
        reason: String,
    },

    /// Tool handler failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The model kept requesting tools past the round limit
    #[error("Tool-call round limit ({limit}) exceeded")]
    ToolLoopExceeded {
        limit: usize,
        /// Conversation as it stood when the limit was hit
        transcript: Vec<Message>,
    },

    /// A pipeline stage failed; `source` is what went wrong inside it
    #[error("Stage '{agent}' failed: {source}")]
    Stage {
        agent: String,
        #[source]
        source: Box<AgentError>,
    },

    /// Caller cancelled the turn
    #[error("Turn cancelled while {phase}")]
    Cancelled { phase: TurnPhase },

    /// Malformed model output (tool arguments, structured replies)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable by the caller.
    ///
    /// The turn loop never retries on its own; this only informs the
    /// embedding application's policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Self::Transport(_) | Self::Io(_))
    }

    /// Wrap a failure of the pipeline stage run by `agent`. Cancellation is
    /// the caller's doing and passes through unwrapped.
    #[must_use]
    pub fn in_stage(self, agent: impl Into<String>) -> Self {
        match self {
            e @ Self::Cancelled { .. } => e,
            other => Self::Stage {
                agent: agent.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through stage wrappers
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error is fed back to the model as a tool result
    /// instead of failing the turn.
    pub const fn is_tool_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_) | Self::InvalidArgument { .. } | Self::ToolExecution { .. }
        )
    }

    /// Prefix transport and authentication errors with where they happened.
    #[must_use]
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Transport(msg) => Self::Transport(format!("{context}: {msg}")),
            Self::Authentication(msg) => Self::Authentication(format!("{context}: {msg}")),
            Self::Parse(msg) => Self::Parse(format!("{context}: {msg}")),
            other => other,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Authentication(_) => {
                "Authentication failed. Check that your model endpoint token is set and valid.".into()
            }
            Self::Transport(msg) => format!("The model endpoint could not be reached: {msg}"),
            Self::UnknownTool(name) => format!("The tool '{name}' is not available."),
            Self::InvalidArgument { parameter, .. } => {
                format!("Invalid tool input for '{parameter}'.")
            }
            Self::ToolExecution { tool, .. } => format!("The tool '{tool}' failed."),
            Self::ToolLoopExceeded { limit, .. } => format!(
                "The agent called tools {limit} times without reaching an answer. Try a simpler request."
            ),
            Self::Stage { agent, source } => format!("{agent}: {}", source.user_message()),
            Self::Cancelled { .. } => "The request was cancelled.".into(),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prefixes_transport() {
        let err = AgentError::Transport("connection refused".into()).context("model call (round 2)");
        assert_eq!(
            err.to_string(),
            "Transport error: model call (round 2): connection refused"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_stage_wraps_everything_but_cancellation() {
        let err = AgentError::Transport("connection refused".into()).in_stage("Concierge");
        assert_eq!(
            err.to_string(),
            "Stage 'Concierge' failed: Transport error: connection refused"
        );
        assert!(err.is_retryable());
        assert!(matches!(err.root(), AgentError::Transport(_)));
        assert!(err.user_message().starts_with("Concierge: The model endpoint could not be reached"));

        let cancelled = AgentError::Cancelled {
            phase: TurnPhase::AwaitingModel,
        }
        .in_stage("Concierge");
        assert!(matches!(cancelled, AgentError::Cancelled { .. }));
    }

    #[test]
    fn test_tool_errors_are_recoverable() {
        assert!(AgentError::UnknownTool("x".into()).is_tool_recoverable());
        assert!(!AgentError::Authentication("no token".into()).is_tool_recoverable());
        assert!(!AgentError::Authentication("no token".into()).is_retryable());
    }
}
