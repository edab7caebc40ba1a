use crate::store::Passage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Pipeline stage identifiers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Retrieve,
    Answer,
    Reflect,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Retrieve => "retrieve",
            Stage::Answer => "answer",
            Stage::Reflect => "reflect",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse intent classification produced by the plan stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentLabel {
    /// A greeting or smalltalk opener; skips retrieval.
    Greeting,
    /// A question about the assistant itself; skips retrieval.
    Meta,
    /// Anything that may need factual grounding.
    Factual,
}

/// Plan stage output: whether the question needs grounding, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub needs_retrieval: bool,
    pub intent: IntentLabel,
}

/// Reflection verdict on the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Relevant,
    NotRelevant,
    /// The grader was unavailable or its verdict was unparseable.
    Unknown,
}

/// Why a turn ended without a normal answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AllProvidersExhausted,
}

/// Degraded-service marker attached to an [`AnswerResult`].
#[derive(Debug, Clone, Serialize)]
pub struct TurnFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Mutable per-question record threaded through the four stages.
///
/// Created at the start of `answer()`, never shared across concurrent
/// questions, and consumed into an [`AnswerResult`] at the end.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub question: String,
    pub plan: Plan,
    pub passages: Vec<Passage>,
    pub raw_answer: String,
    pub relevance: Relevance,
    /// Set when the grader's verdict suggests the answer needs revision.
    pub revised: bool,
    /// Label of the pool entry that served the answer stage.
    pub provider_used: Option<String>,
    pub timings: BTreeMap<Stage, Duration>,
}

impl TurnState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            plan: Plan {
                needs_retrieval: false,
                intent: IntentLabel::Factual,
            },
            passages: Vec::new(),
            raw_answer: String::new(),
            relevance: Relevance::Unknown,
            revised: false,
            provider_used: None,
            timings: BTreeMap::new(),
        }
    }
}

/// Terminal result of [`Agent::answer`](crate::agent::Agent::answer).
///
/// Always returned — degraded outcomes set `error` instead of failing the
/// call.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub answer_text: String,
    pub relevance: Relevance,
    pub provider_used: Option<String>,
    pub retrieved_count: usize,
    pub stage_timings: BTreeMap<Stage, Duration>,
    pub error: Option<TurnFailure>,
}

impl AnswerResult {
    /// Whether this turn ended in degraded service.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
