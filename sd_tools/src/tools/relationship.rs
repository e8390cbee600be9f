//! `relationship.create`, `relationship.update`, `relationship.query`
//! (§4.3, §3 Relationship). Orphan references are rejected at the store
//! layer (invariant #2); the tool just surfaces that as a `ToolError`.

use crate::args::opt_str_field;
use crate::errors::{ToolError, ToolResult};
use crate::registry::{Tool, ToolContext};
use sd_core::ids::CharacterId;
use sd_core::model::Relationship;
use sd_core::time::Tick;

pub struct RelationshipCreate;

impl Tool for RelationshipCreate {
    fn name(&self) -> &'static str {
        "relationship.create"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let a: CharacterId = crate::args::id_field(args, self.name(), "character_a")?;
        let b: CharacterId = crate::args::id_field(args, self.name(), "character_b")?;
        let relationship_type = crate::args::str_field(args, self.name(), "relationship_type")?;

        let mut relationship = Relationship::new(a, b, relationship_type);
        if let Some(status) = opt_str_field(args, "status") {
            relationship.status = status.to_string();
        }
        if let Some(intensity) = crate::args::opt_u8_field(args, "intensity") {
            relationship.set_intensity(intensity);
        }

        ctx.store.add_relationship(relationship).map_err(|e| ToolError::failed(self.name(), e))?;
        Ok(serde_json::json!({ "character_a": a.to_string(), "character_b": b.to_string(), "created": true }))
    }
}

pub struct RelationshipUpdate;

impl Tool for RelationshipUpdate {
    fn name(&self) -> &'static str {
        "relationship.update"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let a: CharacterId = crate::args::id_field(args, self.name(), "character_a")?;
        let b: CharacterId = crate::args::id_field(args, self.name(), "character_b")?;

        let mut relationships = ctx.store.load_relationships().map_err(|e| ToolError::failed(self.name(), e))?;
        let (lo, hi) = sd_core::model::normalize_pair(a, b);
        let relationship = relationships
            .iter_mut()
            .find(|r| r.character_a == lo && r.character_b == hi)
            .ok_or_else(|| ToolError::invalid(self.name(), format!("no relationship between {a} and {b}")))?;

        if let Some(status) = opt_str_field(args, "status") {
            relationship.status = status.to_string();
        }
        if let Some(intensity) = crate::args::opt_u8_field(args, "intensity") {
            relationship.set_intensity(intensity);
        }
        if let Some(event) = opt_str_field(args, "event") {
            let tick = Tick(crate::args::opt_u64_field(args, "tick", 0));
            relationship.history.push(sd_core::model::RelationshipHistoryEntry { tick, event: event.to_string() });
        }

        ctx.store.save_relationships(&relationships).map_err(|e| ToolError::failed(self.name(), e))?;
        Ok(serde_json::json!({ "character_a": lo.to_string(), "character_b": hi.to_string(), "updated": true }))
    }
}

pub struct RelationshipQuery;

impl Tool for RelationshipQuery {
    fn name(&self) -> &'static str {
        "relationship.query"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let a: CharacterId = crate::args::id_field(args, self.name(), "character_a")?;

        if let Some(b_raw) = opt_str_field(args, "character_b") {
            let b: CharacterId =
                b_raw.parse().map_err(|_| ToolError::invalid(self.name(), format!("invalid character_b id: {b_raw}")))?;
            let found = ctx.store.get_relationship_between(a, b).map_err(|e| ToolError::failed(self.name(), e))?;
            return Ok(serde_json::json!({ "relationship": found }));
        }

        let all = ctx.store.get_character_relationships(a).map_err(|e| ToolError::failed(self.name(), e))?;
        Ok(serde_json::json!({ "relationships": all }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::character::CharacterGenerate;
    use sd_llm::InMemoryVectorIndex;
    use sd_store::EntityStore;
    use tempfile::tempdir;

    fn make_characters(ctx: &ToolContext<'_>) {
        CharacterGenerate.execute(ctx, &serde_json::json!({ "name": "Elena Thorne", "role": "protagonist" })).unwrap();
        CharacterGenerate.execute(ctx, &serde_json::json!({ "name": "Marcus Vale", "role": "ally" })).unwrap();
    }

    #[test]
    fn create_rejects_orphan_character() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };
        make_characters(&ctx);

        let err = RelationshipCreate
            .execute(&ctx, &serde_json::json!({ "character_a": "C0", "character_b": "C999", "relationship_type": "allies" }))
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
    }

    #[test]
    fn create_then_query_is_order_independent() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };
        make_characters(&ctx);

        RelationshipCreate
            .execute(&ctx, &serde_json::json!({ "character_a": "C1", "character_b": "C0", "relationship_type": "allies" }))
            .unwrap();

        let result = RelationshipQuery
            .execute(&ctx, &serde_json::json!({ "character_a": "C0", "character_b": "C1" }))
            .unwrap();
        assert!(result["relationship"].is_object());
    }

    #[test]
    fn update_appends_history_event() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };
        make_characters(&ctx);
        RelationshipCreate
            .execute(&ctx, &serde_json::json!({ "character_a": "C0", "character_b": "C1", "relationship_type": "allies" }))
            .unwrap();

        RelationshipUpdate
            .execute(&ctx, &serde_json::json!({ "character_a": "C0", "character_b": "C1", "event": "betrayal", "tick": 3 }))
            .unwrap();

        let rel = store.get_relationship_between(CharacterId(0), CharacterId(1)).unwrap().unwrap();
        assert_eq!(rel.history.len(), 1);
        assert_eq!(rel.history[0].event, "betrayal");
    }
}
