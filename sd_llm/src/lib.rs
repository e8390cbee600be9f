//! External collaborator interfaces (§6): a synchronous text-completion
//! adapter and a semantic-search adapter, plus test doubles for both. No
//! network-calling implementation ships here — the real transport is out
//! of scope (SPEC_FULL.md §1).

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm backend error: {0}")]
    Backend(String),
}

/// Stateless text-completion adapter. The core supplies any conversation
/// framing; implementations must not retain history between calls.
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str, max_tokens: u32, timeout: Duration) -> Result<String, LlmError>;
}

/// Returns scripted responses in call order, for deterministic tests of
/// planner/writer/extractor code that calls `generate` more than once per
/// tick. Panics if exhausted, which surfaces test-setup mistakes early
/// rather than silently degrading to an empty string.
pub struct MockLlmClient {
    responses: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<String>) -> Self {
        // `responses` is consumed front-to-back; reverse once so `pop()`
        // returns calls in the order they were scripted.
        let mut responses = responses;
        responses.reverse();
        MockLlmClient { responses: Mutex::new(responses) }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _prompt: &str, _max_tokens: u32, _timeout: Duration) -> Result<String, LlmError> {
        self.responses
            .lock()
            .pop()
            .ok_or_else(|| LlmError::Backend("MockLlmClient exhausted its scripted responses".to_string()))
    }
}

/// Always returns a configurable canned error, for exercising the
/// orchestrator's failure paths (PlanParseError, FactExtractionError, ...).
pub struct NullLlmClient {
    error: String,
}

impl NullLlmClient {
    pub fn new(error: impl Into<String>) -> Self {
        NullLlmClient { error: error.into() }
    }
}

impl LlmClient for NullLlmClient {
    fn generate(&self, _prompt: &str, _max_tokens: u32, _timeout: Duration) -> Result<String, LlmError> {
        Err(LlmError::Backend(self.error.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Error)]
#[error("vector index error: {0}")]
pub struct VectorError(pub String);

/// Semantic-search adapter (§4.2, §6). Collections are created lazily.
/// `query` is fallible so the core can fall back to recency ordering when
/// a real external index is unreachable.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, collection: &str, id: &str, text: &str, metadata: serde_json::Value);
    fn query(&self, collection: &str, text: &str, k: usize) -> Result<Vec<VectorHit>, VectorError>;
    fn delete(&self, collection: &str, id: &str);
}

struct IndexedDoc {
    text: String,
    metadata: serde_json::Value,
}

/// Keyword-overlap scoring vector index: score is the fraction of query
/// tokens (lowercased, whitespace-split) found in the document text. No
/// embeddings, no external service — sufficient for the no-LLM Semantic
/// Gather stage and for tests.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    collections: Mutex<HashMap<String, HashMap<String, IndexedDoc>>>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn overlap_score(query_tokens: &[String], doc_text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let doc_tokens: std::collections::HashSet<String> = tokenize(doc_text).into_iter().collect();
    let hits = query_tokens.iter().filter(|t| doc_tokens.contains(*t)).count();
    hits as f32 / query_tokens.len() as f32
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn upsert(&self, collection: &str, id: &str, text: &str, metadata: serde_json::Value) {
        let mut collections = self.collections.lock();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), IndexedDoc { text: text.to_string(), metadata });
    }

    fn query(&self, collection: &str, text: &str, k: usize) -> Result<Vec<VectorHit>, VectorError> {
        let collections = self.collections.lock();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let query_tokens = tokenize(text);
        let mut hits: Vec<VectorHit> = docs
            .iter()
            .map(|(id, doc)| VectorHit {
                id: id.clone(),
                score: overlap_score(&query_tokens, &doc.text),
                metadata: doc.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    fn delete(&self, collection: &str, id: &str) {
        if let Some(docs) = self.collections.lock().get_mut(collection) {
            docs.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_llm_client_returns_scripted_responses_in_order() {
        let client = MockLlmClient::new(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(client.generate("p", 10, Duration::from_secs(1)).unwrap(), "first");
        assert_eq!(client.generate("p", 10, Duration::from_secs(1)).unwrap(), "second");
    }

    #[test]
    fn mock_llm_client_errors_when_exhausted() {
        let client = MockLlmClient::new(vec![]);
        assert!(client.generate("p", 10, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn null_llm_client_always_errors() {
        let client = NullLlmClient::new("simulated timeout");
        let err = client.generate("p", 10, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LlmError::Backend(_)));
    }

    #[test]
    fn in_memory_vector_index_ranks_by_keyword_overlap() {
        let index = InMemoryVectorIndex::new();
        index.upsert("scenes", "S000", "Elena enters the quiet archive", serde_json::json!({}));
        index.upsert("scenes", "S001", "Marcus argues in the crowded market", serde_json::json!({}));

        let hits = index.query("scenes", "quiet archive", 5).unwrap();
        assert_eq!(hits[0].id, "S000");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn in_memory_vector_index_query_on_missing_collection_is_empty() {
        let index = InMemoryVectorIndex::new();
        assert!(index.query("nope", "anything", 5).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_a_document_from_future_queries() {
        let index = InMemoryVectorIndex::new();
        index.upsert("lore", "L0", "the old war ended a century ago", serde_json::json!({}));
        index.delete("lore", "L0");
        assert!(index.query("lore", "war", 5).unwrap().is_empty());
    }
}
