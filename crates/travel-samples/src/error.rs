//! Error Types for the Travel Samples

use thiserror::Error;
use turnloop_core::AgentError;

pub type Result<T> = std::result::Result<T, SampleError>;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Unknown scenario '{0}' (try `turnloop list`)")]
    UnknownScenario(String),

    #[error("Scenario '{0}' runs as a handoff pipeline, not a single agent")]
    NotSingleAgent(&'static str),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl SampleError {
    /// Message suitable for the console
    pub fn user_message(&self) -> String {
        match self {
            Self::Agent(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
