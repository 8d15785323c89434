//! Gateway configuration
//!
//! Read from the environment (after `.env` has been loaded by the binary).
//! Both constructors take their values through a lookup function so they can
//! be driven from a map in tests.

use turnloop_core::gateway::DEFAULT_MODEL;

/// GitHub Models inference endpoint
pub const DEFAULT_ENDPOINT: &str = "https://models.github.ai/inference";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Clone)]
pub struct GatewayConfig {
    /// Short label used in logs
    pub name: String,

    /// Base URL; `/chat/completions` and `/models` are appended
    pub endpoint: String,

    /// Model used when a request does not name one
    pub model: String,

    /// Bearer credential
    pub api_key: Option<String>,

    /// Whether the endpoint rejects anonymous requests
    pub requires_key: bool,

    /// Limit for non-streaming requests
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// GitHub Models (or any hosted endpoint) from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Hosted endpoint settings from an arbitrary key lookup.
    ///
    /// `GH_ENDPOINT`, `GH_MODEL_ID`, `GATEWAY_TIMEOUT_SECS`, and the first of
    /// `GH_TOKEN`, `GITHUB_TOKEN` or `OPENAI_API_KEY` that is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            name: "github-models".into(),
            endpoint: get("GH_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            model: get("GH_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL.into()),
            api_key: ["GH_TOKEN", "GITHUB_TOKEN", "OPENAI_API_KEY"]
                .into_iter()
                .find_map(get),
            requires_key: true,
            timeout_secs: get("GATEWAY_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Local Ollama server through its OpenAI-compatible `/v1` API
    pub fn ollama() -> Self {
        Self::ollama_from_lookup(|key| std::env::var(key).ok())
    }

    /// `OLLAMA_HOST` (default `http://localhost`), `OLLAMA_PORT` (default
    /// 11434) and `OLLAMA_MODEL` (default `llama3.2`)
    pub fn ollama_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let host = get("OLLAMA_HOST").unwrap_or_else(|| "http://localhost".into());
        let port: u16 = get("OLLAMA_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self {
            name: "ollama".into(),
            endpoint: format!("{}:{port}/v1", host.trim_end_matches('/')),
            model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into()),
            api_key: None,
            requires_key: false,
            timeout_secs: get("GATEWAY_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("requires_key", &self.requires_key)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
