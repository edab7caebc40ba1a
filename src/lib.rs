//! # RAG Agent
//!
//! A question-answering agent that combines a small local document index
//! with hosted LLM providers, failing over across providers and keys, and
//! grading its own answer before returning it.
//!
//! The core is a four-stage pipeline — **Plan → Retrieve → Answer →
//! Reflect** — where every LLM call transparently exercises a
//! multi-provider, multi-key failover policy. Stages degrade instead of
//! aborting: a failed plan defaults to retrieving, a failed retrieval
//! continues ungrounded, a failed reflection leaves relevance unknown.
//! Only answer-stage exhaustion ends a turn early, and even that comes
//! back as a structured degraded result, never a panic or a raw error.
//!
//! ## Core Concepts
//!
//! - **[`Agent`]** — the orchestrator. One `answer(question)` call runs a
//!   full turn; `pool_status()` snapshots provider health for monitoring.
//! - **[`ProviderPool`]** — ordered (provider, credential) entries with
//!   per-entry health tracking and a cool-down based reset policy.
//! - **[`CompletionGateway`]** — one logical "generate text" call that
//!   walks the pool until an entry succeeds or all are exhausted.
//! - **[`Backend`]** — object-safe trait over provider wire formats
//!   ([`GroqBackend`], [`GeminiBackend`], [`MockBackend`] for tests).
//! - **[`DocumentStore`]** — ranked `search(query, k)` capability;
//!   [`MemoryStore`] is the bundled in-memory implementation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rag_agent::{Agent, AgentConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = MemoryStore::new();
//!     store.add_document(
//!         "solar-benefits",
//!         "The benefits of solar energy include lower bills and reduced emissions.",
//!     );
//!
//!     // Reads GROQ_API_KEY / GEMINI_API_KEY (and their _2/_3 variants).
//!     let config = AgentConfig::from_env()?;
//!     let agent = Agent::new(config, Arc::new(store))?;
//!
//!     let result = agent.answer("What are the benefits of solar energy?").await;
//!     println!("[{}] {}", result.provider_used.as_deref().unwrap_or("-"), result.answer_text);
//!
//!     for entry in agent.pool_status() {
//!         println!("{}: {:?} ({} consecutive failures)",
//!             entry.label, entry.health, entry.consecutive_failures);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod grader;
pub mod parse;
pub mod pool;
pub mod prompts;
pub mod store;
pub mod types;

pub use agent::{Agent, FALLBACK_ANSWER};
pub use backend::{
    Backend, CompletionRequest, GeminiBackend, GroqBackend, MockBackend, ProviderError,
    ProviderErrorKind, ProviderKind, ProviderResponse,
};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use gateway::{Completion, CompletionGateway};
pub use grader::{GradeReport, ReflectionGrader};
pub use pool::{EntryStatus, Health, Lease, Outcome, ProviderPool};
pub use store::{DocumentStore, MemoryStore, Passage};
pub use types::{
    AnswerResult, FailureKind, IntentLabel, Plan, Relevance, Stage, TurnFailure, TurnState,
};
