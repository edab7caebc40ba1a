//! Pipeline orchestrator: the Plan → Retrieve → Answer → Reflect state
//! machine.
//!
//! [`Agent::answer`] runs the four stages per question, carrying a
//! [`TurnState`] through them. Every stage except Answer degrades rather
//! than aborts: a failed plan defaults to retrieving, a failed retrieval
//! continues with empty context, and a failed reflection leaves relevance
//! `Unknown`. Only answer-stage exhaustion ends the turn early, and even
//! that produces a structured degraded result, never an `Err` or a panic.

use crate::backend::CompletionRequest;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::events::{emit, Event, EventHandler};
use crate::gateway::{Completion, CompletionGateway};
use crate::grader::ReflectionGrader;
use crate::parse::parse_choice;
use crate::pool::{EntryStatus, ProviderPool};
use crate::prompts::{self, passage_block};
use crate::store::DocumentStore;
use crate::types::{
    AnswerResult, FailureKind, IntentLabel, Plan, Relevance, Stage, TurnFailure, TurnState,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Fixed text returned when every provider is exhausted during the answer
/// stage.
pub const FALLBACK_ANSWER: &str =
    "I am temporarily unable to answer: every configured AI provider failed. \
     Please try again in a moment.";

/// Question-answering agent over a document store and a provider pool.
///
/// One instance serves many concurrent questions; all methods take
/// `&self`. The provider pool's health state is shared across turns,
/// everything else is per-turn.
pub struct Agent {
    config: AgentConfig,
    store: Arc<dyn DocumentStore>,
    gateway: Arc<CompletionGateway>,
    grader: ReflectionGrader,
    events: Option<Arc<dyn EventHandler>>,
}

impl Agent {
    /// Build an agent from config and a document store, wiring up the
    /// pool and gateway with the default provider backends.
    ///
    /// Fails only on invalid configuration (an empty credential list).
    pub fn new(config: AgentConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let pool = Arc::new(ProviderPool::new(
            config.providers.clone(),
            config.failure_threshold,
            config.cooldown,
        )?);
        let gateway = Arc::new(CompletionGateway::new(pool, &config));
        Ok(Self::from_parts(config, store, gateway))
    }

    /// Assemble an agent around an existing gateway (custom or mock
    /// backends, shared pools).
    pub fn from_parts(
        config: AgentConfig,
        store: Arc<dyn DocumentStore>,
        gateway: Arc<CompletionGateway>,
    ) -> Self {
        Self {
            config,
            store,
            grader: ReflectionGrader::new(gateway.clone()),
            gateway,
            events: None,
        }
    }

    /// Attach an event handler for turn/stage lifecycle events.
    ///
    /// Provider-level events come from the gateway; attach a handler
    /// there (before `from_parts`) to observe failover.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    /// Answer a question through the four-stage pipeline.
    ///
    /// Always returns an [`AnswerResult`]; degraded service is encoded in
    /// its `error` field rather than raised.
    pub async fn answer(&self, question: &str) -> AnswerResult {
        let mut turn = TurnState::new(question);
        info!(question, "turn started");
        emit(
            &self.events,
            Event::TurnStart {
                question: question.to_string(),
            },
        );

        // --- Plan ---
        emit(&self.events, Event::StageStart { stage: Stage::Plan });
        let started = Instant::now();
        turn.plan = self.plan(question).await;
        self.finish_stage(&mut turn, Stage::Plan, started, true);
        info!(
            needs_retrieval = turn.plan.needs_retrieval,
            intent = ?turn.plan.intent,
            "plan complete"
        );

        // --- Retrieve (conditional) ---
        if turn.plan.needs_retrieval {
            emit(
                &self.events,
                Event::StageStart {
                    stage: Stage::Retrieve,
                },
            );
            let started = Instant::now();
            let ok = match self.store.search(question, self.config.retrieval_k).await {
                Ok(passages) => {
                    info!(count = passages.len(), "passages retrieved");
                    turn.passages = passages;
                    true
                }
                Err(err) => {
                    // Retrieval is best-effort: answer ungrounded instead
                    // of failing the turn.
                    warn!(error = %err, "retrieval unavailable, continuing without context");
                    false
                }
            };
            self.finish_stage(&mut turn, Stage::Retrieve, started, ok);
        }

        // --- Answer ---
        emit(
            &self.events,
            Event::StageStart {
                stage: Stage::Answer,
            },
        );
        let started = Instant::now();
        let answer_outcome = self.generate_answer(&turn).await;
        let ok = answer_outcome.is_ok();
        self.finish_stage(&mut turn, Stage::Answer, started, ok);

        match answer_outcome {
            Ok(completion) => {
                turn.raw_answer = completion.text;
                turn.provider_used = Some(completion.provider);
            }
            Err(err) => {
                // The one hard stop: nothing left to generate with.
                warn!(error = %err, "turn degraded: answer stage exhausted all providers");
                emit(&self.events, Event::TurnEnd { degraded: true });
                return AnswerResult {
                    answer_text: FALLBACK_ANSWER.to_string(),
                    relevance: Relevance::Unknown,
                    provider_used: None,
                    retrieved_count: turn.passages.len(),
                    stage_timings: turn.timings,
                    error: Some(TurnFailure {
                        kind: FailureKind::AllProvidersExhausted,
                        message: err.to_string(),
                    }),
                };
            }
        }

        // --- Reflect ---
        emit(
            &self.events,
            Event::StageStart {
                stage: Stage::Reflect,
            },
        );
        let started = Instant::now();
        let report = self
            .grader
            .grade(&turn.question, &turn.raw_answer, &turn.passages)
            .await;
        turn.relevance = report.relevance;
        turn.revised = report.relevance == Relevance::NotRelevant;
        self.finish_stage(
            &mut turn,
            Stage::Reflect,
            started,
            report.relevance != Relevance::Unknown,
        );

        info!(relevance = ?turn.relevance, provider = ?turn.provider_used, "turn complete");
        emit(&self.events, Event::TurnEnd { degraded: false });

        AnswerResult {
            answer_text: turn.raw_answer,
            relevance: turn.relevance,
            provider_used: turn.provider_used,
            retrieved_count: turn.passages.len(),
            stage_timings: turn.timings,
            error: None,
        }
    }

    /// Snapshot provider pool health for monitoring surfaces.
    pub fn pool_status(&self) -> Vec<EntryStatus> {
        self.gateway.pool().status()
    }

    fn finish_stage(&self, turn: &mut TurnState, stage: Stage, started: Instant, ok: bool) {
        let elapsed = started.elapsed();
        turn.timings.insert(stage, elapsed);
        emit(
            &self.events,
            Event::StageEnd {
                stage,
                ok,
                elapsed_ms: elapsed.as_millis() as u64,
            },
        );
    }

    /// Decide whether the question needs factual grounding.
    ///
    /// Greetings and meta-questions are settled by the intent heuristic
    /// without spending a provider call. Everything else asks the model
    /// for a YES/NO verdict; if that call fails or the verdict is
    /// unparseable, grounding wins over hallucination and retrieval
    /// defaults on.
    async fn plan(&self, question: &str) -> Plan {
        let intent = classify_intent(question);
        if intent != IntentLabel::Factual {
            return Plan {
                needs_retrieval: false,
                intent,
            };
        }

        let request = CompletionRequest::new(prompts::render(
            prompts::PLAN_PROMPT,
            &[("question", question)],
        ))
        .with_system(prompts::PLAN_SYSTEM)
        .with_temperature(0.0)
        .with_max_tokens(8);

        let needs_retrieval = match self.gateway.complete(&request, Stage::Plan).await {
            Ok(completion) => match parse_choice(&completion.text, &["YES", "NO"]) {
                Some("NO") => false,
                Some(_) => true,
                None => {
                    warn!(raw = %completion.text, "unparseable plan verdict, defaulting to retrieval");
                    true
                }
            },
            Err(err) => {
                warn!(error = %err, "plan call failed, defaulting to retrieval");
                true
            }
        };

        Plan {
            needs_retrieval,
            intent,
        }
    }

    async fn generate_answer(&self, turn: &TurnState) -> Result<Completion> {
        let prompt = if turn.passages.is_empty() {
            prompts::render(
                prompts::ANSWER_UNGROUNDED_PROMPT,
                &[("question", turn.question.as_str())],
            )
        } else {
            prompts::render(
                prompts::ANSWER_GROUNDED_PROMPT,
                &[
                    ("context", passage_block(&turn.passages).as_str()),
                    ("question", turn.question.as_str()),
                ],
            )
        };

        let request = CompletionRequest::new(prompt)
            .with_system(prompts::ANSWER_SYSTEM)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        self.gateway.complete(&request, Stage::Answer).await
    }
}

/// Keyword heuristic for the plan stage's intent label.
fn classify_intent(question: &str) -> IntentLabel {
    let q = question.trim().to_lowercase();

    const GREETINGS: [&str; 7] = [
        "hi", "hello", "hey", "good morning", "good afternoon", "good evening", "thanks",
    ];
    let opener = q
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric());
    let greets = GREETINGS.iter().any(|g| {
        opener == *g
            || (q.starts_with(*g)
                && q[g.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !c.is_alphanumeric()))
    });
    if greets && q.len() < 40 {
        return IntentLabel::Greeting;
    }

    const META_PHRASES: [&str; 5] = [
        "who are you",
        "what are you",
        "what can you do",
        "how do you work",
        "what model are you",
    ];
    if META_PHRASES.iter().any(|p| q.contains(p)) {
        return IntentLabel::Meta;
    }

    IntentLabel::Factual
}
