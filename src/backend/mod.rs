//! Backend trait and normalized request/error types.
//!
//! The [`Backend`] trait abstracts over hosted completion providers,
//! translating between the normalized [`CompletionRequest`]/[`ProviderResponse`]
//! types and provider-specific HTTP APIs. Built-in implementations:
//! [`GroqBackend`], [`GeminiBackend`], plus [`MockBackend`] for tests.
//!
//! ## Architecture
//!
//! ```text
//! CompletionGateway ──► CompletionRequest ──► Backend::complete() ──► ProviderResponse
//!                                                    │
//!                                        ┌───────────┴───────────┐
//!                                   GroqBackend             GeminiBackend
//!                             /openai/v1/chat/completions  :generateContent
//! ```
//!
//! Every failure is normalized into a [`ProviderError`] so the gateway's
//! failover loop can treat providers uniformly.

pub mod gemini;
pub mod groq;
pub mod mock;

pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use mock::MockBackend;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which hosted provider family a pool entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Groq's OpenAI-compatible chat completions API.
    Groq,
    /// Google's Gemini generateContent API.
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized completion request — provider-agnostic.
///
/// The [`Agent`](crate::agent::Agent) builds one per stage call; the
/// [`Backend`] translates it into the provider-specific HTTP request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system prompt.
    pub system: Option<String>,
    /// The user prompt text.
    pub prompt: String,
    /// Sampling temperature (0.0 = deterministic).
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with the default sampling settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }

    /// Set a system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the generation token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A normalized provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific usage/timing metadata, stored as raw JSON since
    /// each provider returns different fields.
    pub metadata: Option<serde_json::Value>,
}

/// Classification of a single provider attempt failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP 429 or an explicit rate-limit signal.
    RateLimited,
    /// HTTP 401/403 — the credential itself is rejected.
    AuthInvalid,
    /// Connection failure, timeout, or a 5xx from the provider.
    Transport,
    /// The provider answered but the body was empty or not in the
    /// documented shape.
    MalformedResponse,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::AuthInvalid => "auth_invalid",
            ProviderErrorKind::Transport => "transport",
            ProviderErrorKind::MalformedResponse => "malformed_response",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider attempt failure, normalized across providers.
///
/// The gateway records these against the pool and moves on to the next
/// entry; they never surface to `answer()` callers individually.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transport-level failure (connection, timeout, 5xx).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    /// Empty or structurally unexpected provider output.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedResponse, message)
    }

    /// Classify a non-success HTTP status into an error kind.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => ProviderErrorKind::RateLimited,
            401 | 403 => ProviderErrorKind::AuthInvalid,
            _ => ProviderErrorKind::Transport,
        };
        let body = body.trim();
        let snippet = &body[..body.len().min(200)];
        Self::new(kind, format!("HTTP {}: {}", status, snippet))
    }

    /// Whether the same entry may recover on its own (rate limits lift,
    /// transports heal). Auth and malformed-shape failures need operator
    /// intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited | ProviderErrorKind::Transport
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::transport(err.to_string())
    }
}

/// Abstraction over hosted completion providers.
///
/// Implementors translate the normalized [`CompletionRequest`] into the
/// provider's HTTP API and classify every failure into a [`ProviderError`].
/// The credential travels per-call so one backend instance can serve every
/// pool entry of its kind.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one completion attempt with the given credential.
    async fn complete(
        &self,
        client: &Client,
        credential: &str,
        request: &CompletionRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// The provider family this backend serves.
    fn kind(&self) -> ProviderKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            ProviderError::from_status(429, "slow down").kind,
            ProviderErrorKind::RateLimited
        );
        assert_eq!(
            ProviderError::from_status(401, "bad key").kind,
            ProviderErrorKind::AuthInvalid
        );
        assert_eq!(
            ProviderError::from_status(403, "forbidden").kind,
            ProviderErrorKind::AuthInvalid
        );
        assert_eq!(
            ProviderError::from_status(500, "boom").kind,
            ProviderErrorKind::Transport
        );
        assert_eq!(
            ProviderError::from_status(503, "unavailable").kind,
            ProviderErrorKind::Transport
        );
    }

    #[test]
    fn test_from_status_truncates_body() {
        let long_body = "x".repeat(500);
        let err = ProviderError::from_status(500, &long_body);
        assert!(err.message.len() < 250);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ProviderError::new(ProviderErrorKind::RateLimited, "").is_retryable());
        assert!(ProviderError::transport("").is_retryable());
        assert!(!ProviderError::new(ProviderErrorKind::AuthInvalid, "").is_retryable());
        assert!(!ProviderError::malformed("").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::new(ProviderErrorKind::RateLimited, "HTTP 429: slow down");
        assert_eq!(err.to_string(), "rate_limited: HTTP 429: slow down");
    }

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("What is solar power?")
            .with_system("You are helpful.")
            .with_temperature(0.0)
            .with_max_tokens(64);
        assert_eq!(req.prompt, "What is solar power?");
        assert_eq!(req.system.as_deref(), Some("You are helpful."));
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, 64);
    }

    #[test]
    fn test_request_defaults() {
        let req = CompletionRequest::new("q");
        assert!(req.system.is_none());
        assert_eq!(req.temperature, 0.1);
        assert_eq!(req.max_tokens, 1024);
    }
}
