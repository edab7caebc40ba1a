//! Event system for turn, stage, and provider lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe pipeline execution.
//! The agent emits events as each stage starts and finishes, and the
//! gateway emits events as provider attempts fail over. Users can implement
//! [`EventHandler`] to feed a monitoring surface (status dashboard, metrics,
//! logs) without touching the pipeline itself.

use crate::types::Stage;
use std::sync::Arc;

/// Events emitted during a turn.
#[derive(Debug, Clone)]
pub enum Event {
    /// A question has entered the pipeline.
    TurnStart {
        question: String,
    },
    /// A stage has started executing.
    StageStart {
        stage: Stage,
    },
    /// A stage has finished.
    StageEnd {
        stage: Stage,
        /// Whether the stage produced its normal output (a degraded stage
        /// still lets the turn continue).
        ok: bool,
        elapsed_ms: u64,
    },
    /// The gateway is trying a pool entry.
    ProviderAttempt {
        stage: Stage,
        /// Pool entry label (e.g. `"groq-2"`).
        provider: String,
    },
    /// A provider attempt failed; the gateway is advancing.
    ProviderFailed {
        stage: Stage,
        provider: String,
        reason: String,
    },
    /// A provider attempt succeeded; no further entries are tried.
    ProviderSelected {
        stage: Stage,
        provider: String,
    },
    /// Every configured entry failed within one gateway call.
    PoolExhausted {
        stage: Stage,
    },
    /// The turn has completed.
    TurnEnd {
        degraded: bool,
    },
}

/// Handler for pipeline lifecycle events.
///
/// This is entirely optional — the agent works without an event handler.
///
/// # Example
///
/// ```
/// use rag_agent::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::StageStart { stage } => println!("[start] {}", stage),
///             Event::ProviderFailed { provider, reason, .. } => {
///                 println!("[failover] {} failed: {}", provider, reason)
///             }
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the pipeline emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use rag_agent::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::PoolExhausted { stage } = event {
///         eprintln!("no providers left during {}", stage);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
