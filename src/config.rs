//! Agent configuration: credentials, thresholds, timeouts, models.
//!
//! Credentials are ordered — all keys of the preferred (fast/cheap)
//! provider first, then the fallback family. [`AgentConfig::from_env`]
//! reads the same environment variables the deployment surface sets:
//! `GROQ_API_KEY`, `GROQ_API_KEY_2`, `GROQ_API_KEY_3`, then
//! `GEMINI_API_KEY`, `GEMINI_API_KEY_2`, `GEMINI_API_KEY_3`.

use crate::backend::ProviderKind;
use crate::error::{AgentError, Result};
use std::time::Duration;

const GROQ_ENV_KEYS: [&str; 3] = ["GROQ_API_KEY", "GROQ_API_KEY_2", "GROQ_API_KEY_3"];
const GEMINI_ENV_KEYS: [&str; 3] = ["GEMINI_API_KEY", "GEMINI_API_KEY_2", "GEMINI_API_KEY_3"];

/// Configuration for an [`Agent`](crate::agent::Agent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ordered `(kind, credential)` pairs; priority order is preserved.
    pub providers: Vec<(ProviderKind, String)>,

    /// Consecutive failures before an entry is soft-disabled. Default: 2.
    pub failure_threshold: u32,

    /// How long an unhealthy entry stays skipped. Default: 60 s.
    pub cooldown: Duration,

    /// Per-attempt deadline for one provider call. Default: 8 s.
    pub request_timeout: Duration,

    /// Passages requested from the document store. Default: 3.
    pub retrieval_k: usize,

    /// Model used for Groq entries.
    pub groq_model: String,

    /// Model used for Gemini entries.
    pub gemini_model: String,

    /// Sampling temperature for answer generation.
    pub temperature: f64,

    /// Token budget for answer generation.
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
            request_timeout: Duration::from_secs(8),
            retrieval_k: 3,
            groq_model: "llama-3.1-8b-instant".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

impl AgentConfig {
    /// Create a config with the given ordered credentials and defaults
    /// for everything else.
    pub fn new(providers: Vec<(ProviderKind, String)>) -> Self {
        Self {
            providers,
            ..Self::default()
        }
    }

    /// Build a config from environment variables.
    ///
    /// Collects every non-empty key in priority order (Groq keys first,
    /// then Gemini). Fails with [`AgentError::InvalidConfig`] if none are
    /// set — the provider pool cannot be empty.
    pub fn from_env() -> Result<Self> {
        let mut providers = Vec::new();
        for name in GROQ_ENV_KEYS {
            if let Some(key) = read_env(name) {
                providers.push((ProviderKind::Groq, key));
            }
        }
        for name in GEMINI_ENV_KEYS {
            if let Some(key) = read_env(name) {
                providers.push((ProviderKind::Gemini, key));
            }
        }

        if providers.is_empty() {
            return Err(AgentError::InvalidConfig(
                "no provider credentials configured; set GROQ_API_KEY or GEMINI_API_KEY"
                    .to_string(),
            ));
        }

        Ok(Self::new(providers))
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_groq_model(mut self, model: impl Into<String>) -> Self {
        self.groq_model = model.into();
        self
    }

    pub fn with_gemini_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
