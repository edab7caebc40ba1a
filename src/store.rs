//! Document store capability consumed by the retrieval stage.
//!
//! The pipeline only depends on the [`DocumentStore`] trait — a ranked
//! `search(query, k)` over some corpus. [`MemoryStore`] is the bundled
//! reference implementation: an in-memory term-frequency index good enough
//! for demos and tests. Real deployments can plug in a vector database
//! behind the same trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A retrieved passage, ranked by relevance.
///
/// Owned by the store; the pipeline holds read-only copies inside its
/// turn state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source_id: String,
    /// Descending-sorted relevance score; scale is store-specific.
    pub score: f32,
}

/// Ranked semantic search over a small corpus.
///
/// # Contract
///
/// `search` returns at most `k` passages ordered by descending relevance.
/// An empty result is valid (nothing matched), not an error — callers must
/// not assume a minimum count.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>>;
}

/// An in-memory term-frequency index.
///
/// Scores documents by cosine similarity between L2-normalized term
/// frequency vectors. No embedding model, no persistence — just enough
/// ranking to exercise the pipeline.
///
/// # Example
///
/// ```
/// use rag_agent::store::MemoryStore;
///
/// let mut store = MemoryStore::new();
/// store.add_document("solar-basics", "Solar panels convert sunlight into electricity.");
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Vec<IndexedDoc>,
}

#[derive(Debug)]
struct IndexedDoc {
    source_id: String,
    text: String,
    terms: HashMap<String, f32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one document under the given source id.
    pub fn add_document(&mut self, source_id: impl Into<String>, text: impl Into<String>) {
        let text = text.into();
        self.docs.push(IndexedDoc {
            source_id: source_id.into(),
            terms: term_vector(&text),
            text,
        });
    }

    /// Index a batch of `(source_id, text)` documents.
    pub fn add_documents<I, S, T>(&mut self, documents: I)
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        for (source_id, text) in documents {
            self.add_document(source_id, text);
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn ranked(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_terms = term_vector(query);
        if query_terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<Passage> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let score = cosine(&query_terms, &doc.terms);
                (score > 0.0).then(|| Passage {
                    text: doc.text.clone(),
                    source_id: doc.source_id.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        Ok(self.ranked(query, k))
    }
}

/// Lowercased alphanumeric tokens mapped to L2-normalized counts.
fn term_vector(text: &str) -> HashMap<String, f32> {
    let mut counts: HashMap<String, f32> = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
    {
        *counts.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }

    let norm: f32 = counts.values().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in counts.values_mut() {
            *v /= norm;
        }
    }
    counts
}

fn cosine(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    // Both vectors are already normalized; the dot product is the cosine.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, wa)| large.get(term).map(|wb| wa * wb))
        .sum()
}
