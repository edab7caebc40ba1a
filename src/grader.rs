//! Reflection grader: post-hoc relevance check on the final answer.
//!
//! A single gateway call asks the model for a bounded verdict (`RELEVANT`
//! or `NOT_RELEVANT`). Grading is best-effort: any gateway failure or
//! unparseable verdict degrades to [`Relevance::Unknown`] — it never
//! fails the turn.

use crate::backend::CompletionRequest;
use crate::gateway::CompletionGateway;
use crate::parse::parse_choice;
use crate::prompts::{self, passage_block};
use crate::store::Passage;
use crate::types::{Relevance, Stage};
use std::sync::Arc;
use tracing::{debug, warn};

const RELEVANT: &str = "RELEVANT";
const NOT_RELEVANT: &str = "NOT_RELEVANT";

/// Outcome of grading one answer.
#[derive(Debug, Clone)]
pub struct GradeReport {
    pub relevance: Relevance,
    /// Label of the pool entry that served the grading call, if any.
    pub provider: Option<String>,
}

/// Grades answers through the shared completion gateway.
pub struct ReflectionGrader {
    gateway: Arc<CompletionGateway>,
}

impl ReflectionGrader {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Score `answer` against `question` (and the passages it was grounded
    /// on). Never errors: unavailable or unparseable grading yields
    /// [`Relevance::Unknown`].
    pub async fn grade(
        &self,
        question: &str,
        answer: &str,
        passages: &[Passage],
    ) -> GradeReport {
        let prompt = prompts::render(
            prompts::REFLECT_PROMPT,
            &[
                ("question", question),
                ("answer", answer),
                ("context", &passage_block(passages)),
            ],
        );
        let request = CompletionRequest::new(prompt)
            .with_system(prompts::REFLECT_SYSTEM)
            .with_temperature(0.0)
            .with_max_tokens(16);

        let completion = match self.gateway.complete(&request, Stage::Reflect).await {
            Ok(c) => c,
            Err(err) => {
                warn!(error = %err, "grading unavailable, relevance unknown");
                return GradeReport {
                    relevance: Relevance::Unknown,
                    provider: None,
                };
            }
        };

        // NOT_RELEVANT first: it embeds the other label, and earlier
        // choices win ties at the same text position.
        let relevance = match parse_choice(&completion.text, &[NOT_RELEVANT, RELEVANT]) {
            Some(NOT_RELEVANT) => Relevance::NotRelevant,
            Some(_) => Relevance::Relevant,
            None => {
                debug!(raw = %completion.text, "unparseable grading verdict");
                Relevance::Unknown
            }
        };

        GradeReport {
            relevance,
            provider: Some(completion.provider),
        }
    }
}
