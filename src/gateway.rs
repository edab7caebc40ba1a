//! Completion gateway: one logical "generate text" call with failover.
//!
//! [`CompletionGateway::complete`] walks the [`ProviderPool`] in priority
//! order, issuing the request against each leased entry until one
//! succeeds. Every attempt is bounded by a per-attempt timeout, every
//! failure is reported back to the pool, and the same entry is never
//! retried within one call — failover always advances to a different
//! entry. First success wins.

use crate::backend::{Backend, CompletionRequest, ProviderError, ProviderKind};
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::events::{emit, Event, EventHandler};
use crate::pool::{Outcome, ProviderPool};
use crate::types::Stage;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A successful completion and the pool entry that produced it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// Label of the entry that served the call (e.g. `"groq-2"`).
    pub provider: String,
}

/// Gateway over the provider pool.
///
/// Holds one backend instance per [`ProviderKind`]; the leased entry's
/// credential travels per call, so three Groq keys share one
/// [`GroqBackend`](crate::backend::GroqBackend).
pub struct CompletionGateway {
    pool: Arc<ProviderPool>,
    client: Client,
    backends: HashMap<ProviderKind, Arc<dyn Backend>>,
    request_timeout: Duration,
    events: Option<Arc<dyn EventHandler>>,
}

impl CompletionGateway {
    /// Create a gateway with the default Groq and Gemini backends, using
    /// the models and timeout from `config`.
    pub fn new(pool: Arc<ProviderPool>, config: &AgentConfig) -> Self {
        let mut backends: HashMap<ProviderKind, Arc<dyn Backend>> = HashMap::new();
        backends.insert(
            ProviderKind::Groq,
            Arc::new(crate::backend::GroqBackend::new(&config.groq_model)),
        );
        backends.insert(
            ProviderKind::Gemini,
            Arc::new(crate::backend::GeminiBackend::new(&config.gemini_model)),
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            pool,
            client,
            backends,
            request_timeout: config.request_timeout,
            events: None,
        }
    }

    /// Replace the backend for its kind (test seam and custom providers).
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    /// Attach an event handler for provider lifecycle events.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    /// The shared pool backing this gateway.
    pub fn pool(&self) -> &Arc<ProviderPool> {
        &self.pool
    }

    /// Generate text, failing over across pool entries.
    ///
    /// Returns the first successful completion, or
    /// [`AgentError::AllProvidersExhausted`] once every entry has been
    /// tried. Each tried entry gets exactly one [`Outcome`] reported.
    pub async fn complete(&self, request: &CompletionRequest, stage: Stage) -> Result<Completion> {
        let mut tried = Vec::new();
        let mut last_error: Option<ProviderError> = None;

        while let Some(lease) = self.pool.acquire(&tried) {
            tried.push(lease.index);

            let Some(backend) = self.backends.get(&lease.kind) else {
                // Misconfiguration rather than a provider fault, but the
                // entry is unusable all the same.
                let err =
                    ProviderError::transport(format!("no backend registered for {}", lease.kind));
                self.pool.report(lease.index, Outcome::Failure);
                last_error = Some(err);
                continue;
            };

            emit(
                &self.events,
                Event::ProviderAttempt {
                    stage,
                    provider: lease.label.clone(),
                },
            );
            debug!(stage = %stage, provider = %lease.label, "attempting completion");

            let attempt = tokio::time::timeout(
                self.request_timeout,
                backend.complete(&self.client, &lease.credential, request),
            )
            .await;

            let outcome = match attempt {
                Err(_) => Err(ProviderError::transport(format!(
                    "provider call timed out after {:?}",
                    self.request_timeout
                ))),
                Ok(result) => result.and_then(|resp| {
                    if resp.text.trim().is_empty() {
                        Err(ProviderError::malformed("provider returned empty text"))
                    } else {
                        Ok(resp)
                    }
                }),
            };

            match outcome {
                Ok(resp) => {
                    self.pool.report(lease.index, Outcome::Success);
                    emit(
                        &self.events,
                        Event::ProviderSelected {
                            stage,
                            provider: lease.label.clone(),
                        },
                    );
                    info!(stage = %stage, provider = %lease.label, "completion served");
                    return Ok(Completion {
                        text: resp.text,
                        provider: lease.label,
                    });
                }
                Err(err) => {
                    self.pool.report(lease.index, Outcome::Failure);
                    warn!(
                        stage = %stage,
                        provider = %lease.label,
                        error = %err,
                        "provider attempt failed, advancing"
                    );
                    emit(
                        &self.events,
                        Event::ProviderFailed {
                            stage,
                            provider: lease.label,
                            reason: err.to_string(),
                        },
                    );
                    last_error = Some(err);
                }
            }
        }

        emit(&self.events, Event::PoolExhausted { stage });
        warn!(stage = %stage, "all providers exhausted");
        Err(AgentError::AllProvidersExhausted { last: last_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        MockBackend, ProviderErrorKind, ProviderKind, ProviderResponse,
    };
    use crate::pool::Health;
    use async_trait::async_trait;

    fn test_pool(groq_keys: usize, gemini_keys: usize) -> Arc<ProviderPool> {
        let mut creds = Vec::new();
        for i in 0..groq_keys {
            creds.push((ProviderKind::Groq, format!("gsk_test_{}", i + 1)));
        }
        for i in 0..gemini_keys {
            creds.push((ProviderKind::Gemini, format!("AIza_test_{}", i + 1)));
        }
        Arc::new(ProviderPool::new(creds, 2, Duration::from_secs(60)).unwrap())
    }

    fn gateway_with(pool: Arc<ProviderPool>, backends: Vec<Arc<dyn Backend>>) -> CompletionGateway {
        let mut gateway = CompletionGateway::new(pool, &AgentConfig::default());
        for backend in backends {
            gateway = gateway.with_backend(backend);
        }
        gateway
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let pool = test_pool(3, 0);
        let mock = Arc::new(MockBackend::fixed(ProviderKind::Groq, "the answer"));
        let gateway = gateway_with(pool.clone(), vec![mock.clone()]);

        let completion = gateway
            .complete(&CompletionRequest::new("q"), Stage::Answer)
            .await
            .unwrap();

        assert_eq!(completion.text, "the answer");
        assert_eq!(completion.provider, "groq-1");
        assert_eq!(mock.calls(), 1);
        assert_eq!(pool.status()[0].health, Health::Healthy);
    }

    #[tokio::test]
    async fn test_failover_to_last_entry() {
        let pool = test_pool(3, 0);
        let mock = Arc::new(MockBackend::new(
            ProviderKind::Groq,
            vec![
                Err(ProviderError::transport("key 1 down")),
                Err(ProviderError::new(ProviderErrorKind::RateLimited, "key 2 limited")),
                Ok("served by key 3".into()),
            ],
        ));
        let gateway = gateway_with(pool.clone(), vec![mock.clone()]);

        let completion = gateway
            .complete(&CompletionRequest::new("q"), Stage::Answer)
            .await
            .unwrap();

        assert_eq!(completion.text, "served by key 3");
        assert_eq!(completion.provider, "groq-3");
        // Exactly one failure recorded per failed entry, one success on the winner.
        let status = pool.status();
        assert_eq!(status[0].consecutive_failures, 1);
        assert_eq!(status[1].consecutive_failures, 1);
        assert_eq!(status[2].consecutive_failures, 0);
        assert_eq!(status[2].health, Health::Healthy);
        assert_eq!(
            mock.credentials_seen(),
            vec!["gsk_test_1", "gsk_test_2", "gsk_test_3"]
        );
    }

    #[tokio::test]
    async fn test_cross_kind_failover() {
        let pool = test_pool(1, 1);
        let groq = Arc::new(MockBackend::always_failing(
            ProviderKind::Groq,
            ProviderErrorKind::AuthInvalid,
        ));
        let gemini = Arc::new(MockBackend::fixed(ProviderKind::Gemini, "gemini says hi"));
        let gateway = gateway_with(pool, vec![groq, gemini]);

        let completion = gateway
            .complete(&CompletionRequest::new("q"), Stage::Answer)
            .await
            .unwrap();
        assert_eq!(completion.provider, "gemini-1");
    }

    #[tokio::test]
    async fn test_all_fail_is_exhausted() {
        let pool = test_pool(2, 1);
        let groq = Arc::new(MockBackend::always_failing(
            ProviderKind::Groq,
            ProviderErrorKind::Transport,
        ));
        let gemini = Arc::new(MockBackend::always_failing(
            ProviderKind::Gemini,
            ProviderErrorKind::RateLimited,
        ));
        let gateway = gateway_with(pool.clone(), vec![groq, gemini]);

        let err = gateway
            .complete(&CompletionRequest::new("q"), Stage::Answer)
            .await
            .expect_err("every key is scripted to fail");

        match err {
            AgentError::AllProvidersExhausted { last } => {
                let last = last.expect("last error carried for diagnostics");
                assert_eq!(last.kind, ProviderErrorKind::RateLimited);
            }
            other => panic!("expected AllProvidersExhausted, got {:?}", other),
        }
        // Each tried entry recorded exactly one failure — no partial state.
        for status in pool.status() {
            assert_eq!(status.consecutive_failures, 1);
        }
    }

    #[tokio::test]
    async fn test_empty_text_counts_as_malformed() {
        let pool = test_pool(2, 0);
        let mock = Arc::new(MockBackend::new(
            ProviderKind::Groq,
            vec![Ok("   ".into()), Ok("real answer".into())],
        ));
        let gateway = gateway_with(pool.clone(), vec![mock]);

        let completion = gateway
            .complete(&CompletionRequest::new("q"), Stage::Answer)
            .await
            .unwrap();
        assert_eq!(completion.text, "real answer");
        assert_eq!(completion.provider, "groq-2");
        assert_eq!(pool.status()[0].consecutive_failures, 1);
    }

    /// A backend that never answers within any reasonable deadline.
    struct StallingBackend;

    #[async_trait]
    impl Backend for StallingBackend {
        async fn complete(
            &self,
            _client: &Client,
            _credential: &str,
            _request: &CompletionRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("the gateway timeout fires first");
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Groq
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transport_failure() {
        let pool = test_pool(1, 0);
        let mut gateway = CompletionGateway::new(pool.clone(), &AgentConfig::default());
        gateway = gateway.with_backend(Arc::new(StallingBackend));

        let err = gateway
            .complete(&CompletionRequest::new("q"), Stage::Answer)
            .await
            .expect_err("stalled call must time out");

        match err {
            AgentError::AllProvidersExhausted { last } => {
                let last = last.unwrap();
                assert_eq!(last.kind, ProviderErrorKind::Transport);
                assert!(last.message.contains("timed out"));
            }
            other => panic!("expected AllProvidersExhausted, got {:?}", other),
        }
        assert_eq!(pool.status()[0].consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_events_trace_failover() {
        use crate::events::FnEventHandler;
        use std::sync::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let pool = test_pool(2, 0);
        let mock = Arc::new(MockBackend::new(
            ProviderKind::Groq,
            vec![Err(ProviderError::transport("down")), Ok("ok".into())],
        ));
        let gateway = gateway_with(pool, vec![mock]).with_event_handler(Arc::new(
            FnEventHandler(move |event: Event| {
                let tag = match event {
                    Event::ProviderAttempt { provider, .. } => format!("attempt:{}", provider),
                    Event::ProviderFailed { provider, .. } => format!("failed:{}", provider),
                    Event::ProviderSelected { provider, .. } => format!("selected:{}", provider),
                    _ => return,
                };
                seen_clone.lock().unwrap().push(tag);
            }),
        ));

        gateway
            .complete(&CompletionRequest::new("q"), Stage::Plan)
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "attempt:groq-1",
                "failed:groq-1",
                "attempt:groq-2",
                "selected:groq-2"
            ]
        );
    }
}
