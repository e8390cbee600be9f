//! Semantic Index Adapter (§4.2): canonical-text indexing per entity kind,
//! with a recency-ordered fallback when the underlying `VectorIndex` fails.

use sd_core::model::{Character, Faction, Location, Lore, Scene};
use sd_llm::VectorIndex;

const CHARACTERS: &str = "characters";
const LOCATIONS: &str = "locations";
const SCENES: &str = "scenes";
const LORE: &str = "lore";

/// A relevance-ordered id, or a recency-ordered id when the index could
/// not be queried (§4.2: "falls back to `list()` with recency ordering").
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

pub struct SemanticIndex<'a> {
    index: &'a dyn VectorIndex,
}

impl<'a> SemanticIndex<'a> {
    pub fn new(index: &'a dyn VectorIndex) -> Self {
        SemanticIndex { index }
    }

    pub fn index_character(&self, character: &Character) {
        let text = format!(
            "{} {} {}. {}. {}",
            character.display_name(),
            character.role,
            character.description,
            character.current_state.emotional_state,
            character.current_state.physical_state,
        );
        self.index.upsert(CHARACTERS, &character.id.to_string(), &text, serde_json::json!({}));
    }

    pub fn index_location(&self, location: &Location) {
        let text = format!("{}. {}. {}", location.name, location.description, location.atmosphere);
        self.index.upsert(LOCATIONS, &location.id.to_string(), &text, serde_json::json!({}));
    }

    pub fn index_scene(&self, scene: &Scene) {
        let text = format!("{} {}", scene.title, scene.summary.join(" "));
        self.index.upsert(SCENES, &scene.id.to_string(), &text, serde_json::json!({ "tick": scene.tick.0 }));
    }

    pub fn index_lore(&self, lore: &Lore) {
        let text = format!("{} {}", lore.category, lore.fact);
        self.index.upsert(LORE, &lore.id.to_string(), &text, serde_json::json!({}));
    }

    pub fn index_faction(&self, faction: &Faction) {
        let text = format!("{} {} {}", faction.name, faction.kind, faction.summary);
        self.index.upsert("factions", &faction.id.to_string(), &text, serde_json::json!({}));
    }

    /// Search `kind`'s collection, falling back to the supplied
    /// recency-ordered ids (most recent first, already truncated to `k`
    /// by the caller) if the underlying index errors.
    pub fn search_or_recency(&self, kind: &str, query: &str, k: usize, recency_fallback: &[String]) -> Vec<SearchHit> {
        match self.index.query(kind, query, k) {
            Ok(hits) => hits.into_iter().map(|h| SearchHit { id: h.id, score: h.score }).collect(),
            Err(err) => {
                tracing::warn!(%kind, %err, "semantic search failed, falling back to recency order");
                recency_fallback
                    .iter()
                    .take(k)
                    .enumerate()
                    .map(|(rank, id)| SearchHit { id: id.clone(), score: 1.0 / (rank as f32 + 1.0) })
                    .collect()
            }
        }
    }
}
