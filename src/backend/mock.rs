//! Mock backend for testing without live providers.
//!
//! [`MockBackend`] returns scripted outcomes — successes *and* failures —
//! in order, allowing deterministic failover tests against the pool and
//! gateway.
//!
//! # Example
//!
//! ```
//! use rag_agent::backend::{MockBackend, ProviderKind};
//!
//! let mock = MockBackend::fixed(ProviderKind::Groq, "Hello, world!");
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{
    Backend, CompletionRequest, ProviderError, ProviderErrorKind, ProviderKind, ProviderResponse,
};

/// One scripted attempt outcome.
pub type MockOutcome = Result<String, ProviderError>;

/// A test backend that replays scripted outcomes in order.
///
/// Cycles back to the beginning when all outcomes have been consumed.
/// Credentials seen by each attempt are recorded so tests can assert
/// which pool entry served a call.
#[derive(Debug)]
pub struct MockBackend {
    kind: ProviderKind,
    outcomes: Vec<MockOutcome>,
    index: AtomicUsize,
    credentials_seen: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Create a mock backend with the given scripted outcomes.
    pub fn new(kind: ProviderKind, outcomes: Vec<MockOutcome>) -> Self {
        assert!(
            !outcomes.is_empty(),
            "MockBackend requires at least one outcome"
        );
        Self {
            kind,
            outcomes,
            index: AtomicUsize::new(0),
            credentials_seen: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always succeeds with the same text.
    pub fn fixed(kind: ProviderKind, text: impl Into<String>) -> Self {
        Self::new(kind, vec![Ok(text.into())])
    }

    /// Create a mock that always fails with the same error kind.
    pub fn always_failing(kind: ProviderKind, error_kind: ProviderErrorKind) -> Self {
        Self::new(
            kind,
            vec![Err(ProviderError::new(error_kind, "scripted failure"))],
        )
    }

    /// How many attempts this backend has served.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// The credentials seen so far, in attempt order.
    pub fn credentials_seen(&self) -> Vec<String> {
        self.credentials_seen.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> MockOutcome {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.outcomes.len();
        self.outcomes[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        credential: &str,
        _request: &CompletionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.credentials_seen
            .lock()
            .unwrap()
            .push(credential.to_string());
        let text = self.next_outcome()?;
        Ok(ProviderResponse {
            text,
            status: 200,
            metadata: None,
        })
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new("test")
    }

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let mock = MockBackend::fixed(ProviderKind::Groq, "Hello!");
        let client = Client::new();
        let resp = mock.complete(&client, "key-1", &request()).await.unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.status, 200);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_cycles_outcomes() {
        let mock = MockBackend::new(
            ProviderKind::Groq,
            vec![Ok("first".into()), Err(ProviderError::transport("down"))],
        );
        let client = Client::new();
        assert!(mock.complete(&client, "k", &request()).await.is_ok());
        assert!(mock.complete(&client, "k", &request()).await.is_err());
        // cycles
        assert!(mock.complete(&client, "k", &request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_records_credentials() {
        let mock = MockBackend::fixed(ProviderKind::Gemini, "ok");
        let client = Client::new();
        mock.complete(&client, "key-a", &request()).await.unwrap();
        mock.complete(&client, "key-b", &request()).await.unwrap();
        assert_eq!(mock.credentials_seen(), vec!["key-a", "key-b"]);
    }

    #[tokio::test]
    async fn test_always_failing() {
        let mock = MockBackend::always_failing(ProviderKind::Groq, ProviderErrorKind::RateLimited);
        let client = Client::new();
        let err = mock
            .complete(&client, "k", &request())
            .await
            .expect_err("scripted failure");
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    }
}
