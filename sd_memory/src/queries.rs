//! Read-only query helpers over in-memory entity collections, used by the
//! Context Builders (§4.4) to assemble planner/writer context sections.

use sd_core::ids::CharacterId;
use sd_core::model::{Importance, OpenLoop, OpenLoopStatus, Relationship};

/// Open loops ordered by the rule in §4.4: highest importance first, ties
/// broken by `last_mentioned_tick` descending.
pub fn prioritized_open_loops(loops: &[OpenLoop]) -> Vec<&OpenLoop> {
    let mut open: Vec<&OpenLoop> = loops.iter().filter(|l| l.status == OpenLoopStatus::Open).collect();
    open.sort_by(|a, b| {
        b.importance.cmp(&a.importance).then_with(|| {
            let a_tick = a.last_mentioned_tick.map(|t| t.0).unwrap_or(0);
            let b_tick = b.last_mentioned_tick.map(|t| t.0).unwrap_or(0);
            b_tick.cmp(&a_tick)
        })
    });
    open
}

pub fn top_open_loops(loops: &[OpenLoop], n: usize) -> Vec<&OpenLoop> {
    prioritized_open_loops(loops).into_iter().take(n).collect()
}

/// Keyword-overlap relevance score over `category + description`, used by
/// the Semantic Gather stage's open-loop retrieval (§4.5) independent of
/// the vector index (it runs "no LLM").
pub fn open_loop_relevance(loop_: &OpenLoop, query: &str) -> f32 {
    let haystack = format!("{} {}", loop_.category, loop_.description).to_lowercase();
    let query = query.to_lowercase();
    let query_words: Vec<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let hits = query_words.iter().filter(|w| haystack.contains(*w)).count();
    hits as f32 / query_words.len() as f32
}

pub fn top_k_relevant_open_loops<'a>(loops: &'a [OpenLoop], query: &str, k: usize) -> Vec<&'a OpenLoop> {
    let mut scored: Vec<(&OpenLoop, f32)> =
        loops.iter().filter(|l| l.status == OpenLoopStatus::Open).map(|l| (l, open_loop_relevance(l, query))).collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(k).map(|(l, _)| l).collect()
}

/// Relationships from `character`'s perspective, i.e. every relationship
/// record involving it, regardless of canonical storage order (§4.4).
pub fn relationships_for(relationships: &[Relationship], character: CharacterId) -> Vec<&Relationship> {
    relationships.iter().filter(|r| r.involves(character)).collect()
}
