use crate::backend::ProviderError;
use thiserror::Error;

/// Errors produced by the agent and its components.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A single provider attempt failed.
    ///
    /// Recovered internally by the
    /// [`CompletionGateway`](crate::gateway::CompletionGateway) failover loop;
    /// callers only ever see the aggregate [`AllProvidersExhausted`] outcome.
    ///
    /// [`AllProvidersExhausted`]: AgentError::AllProvidersExhausted
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every configured provider entry was unhealthy or failed within one
    /// gateway call. `last` carries the final attempt's error for diagnostics.
    #[error("all providers exhausted")]
    AllProvidersExhausted { last: Option<ProviderError> },

    /// The document store could not serve a search. Recovered locally by the
    /// orchestrator (the turn continues with empty context).
    #[error("retrieval unavailable: {0}")]
    Retrieval(String),

    /// Invalid configuration detected at startup (e.g. no provider
    /// credentials at all).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
