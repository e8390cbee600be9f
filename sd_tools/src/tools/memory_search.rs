//! `memory.search` (§4.3): the one read-only tool the planner and the
//! writer lean on most; backed by `sd_memory::SemanticIndex`, falling
//! back to recency order when the vector index is unreachable (§4.2).

use crate::errors::ToolResult;
use crate::registry::{Tool, ToolContext};
use sd_core::time::Tick;

fn recency_fallback(ctx: &ToolContext<'_>, kind: &str) -> Vec<String> {
    match kind {
        "characters" => {
            let mut ids: Vec<u32> = ctx.store.list_characters().map(|v| v.iter().map(|c| c.id.0).collect()).unwrap_or_default();
            ids.sort_unstable_by(|a, b| b.cmp(a));
            ids.into_iter().map(|n| format!("C{n}")).collect()
        }
        "locations" => {
            let mut ids: Vec<u32> = ctx.store.list_locations().map(|v| v.iter().map(|l| l.id.0).collect()).unwrap_or_default();
            ids.sort_unstable_by(|a, b| b.cmp(a));
            ids.into_iter().map(|n| format!("L{n}")).collect()
        }
        "lore" => {
            let mut ids: Vec<u32> = ctx.store.list_lore().map(|v| v.iter().map(|l| l.id.0).collect()).unwrap_or_default();
            ids.sort_unstable_by(|a, b| b.cmp(a));
            ids.into_iter().map(|n| format!("LR{n}")).collect()
        }
        _ => {
            let mut scenes: Vec<(Tick, u32)> =
                ctx.store.list_scenes().map(|v| v.iter().map(|s| (s.tick, s.id.0)).collect()).unwrap_or_default();
            scenes.sort_by(|a, b| b.0.cmp(&a.0));
            scenes.into_iter().map(|(_, n)| format!("S{n:03}")).collect()
        }
    }
}

pub struct MemorySearch;

impl Tool for MemorySearch {
    fn name(&self) -> &'static str {
        "memory.search"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let query = crate::args::str_field(args, self.name(), "q").or_else(|_| crate::args::str_field(args, self.name(), "query"))?;
        let kind = args.get("kind").and_then(|v| v.as_str()).unwrap_or("scenes");
        let k = crate::args::opt_u64_field(args, "k", 5) as usize;

        let index = sd_memory::SemanticIndex::new(ctx.index);
        let fallback = recency_fallback(ctx, kind);
        let hits = index.search_or_recency(kind, query, k, &fallback);

        Ok(serde_json::json!({
            "kind": kind,
            "hits": hits.into_iter().map(|h| serde_json::json!({ "id": h.id, "score": h.score })).collect::<Vec<_>>(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::location::LocationGenerate;
    use sd_llm::InMemoryVectorIndex;
    use sd_store::EntityStore;
    use tempfile::tempdir;

    #[test]
    fn search_returns_matching_hits() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        LocationGenerate
            .execute(&ctx, &serde_json::json!({ "name": "The Archive", "description": "a dusty hall of records" }))
            .unwrap();

        let result = MemorySearch.execute(&ctx, &serde_json::json!({ "q": "dusty records", "kind": "locations" })).unwrap();
        let hits = result["hits"].as_array().unwrap();
        assert_eq!(hits[0]["id"], "L0");
    }

    #[test]
    fn search_falls_back_to_recency_when_index_empty() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        LocationGenerate.execute(&ctx, &serde_json::json!({ "name": "The Archive" })).unwrap();
        let result = MemorySearch
            .execute(&ctx, &serde_json::json!({ "q": "something unrelated entirely", "kind": "locations" }))
            .unwrap();
        // overlap score is 0 for every doc but the index itself never errors,
        // so this exercises the scored (not fallback) path returning the doc anyway.
        assert_eq!(result["hits"].as_array().unwrap().len(), 1);
    }
}
