//! `character.generate` and `character.update` (§4.3, §3 Character).

use crate::args::{opt_str_field, opt_str_list, str_field};
use crate::errors::{ToolError, ToolResult};
use crate::registry::{Tool, ToolContext};
use crate::tools::split_name;
use sd_core::ids::CharacterId;
use sd_core::model::{Character, CharacterState, Personality};
use sd_core::time::now_iso8601;

pub struct CharacterGenerate;

impl Tool for CharacterGenerate {
    fn name(&self) -> &'static str {
        "character.generate"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let name = str_field(args, self.name(), "name")?;
        let role = str_field(args, self.name(), "role")?;
        let (first_name, family_name) = split_name(name);

        let id = ctx
            .store
            .next_id(sd_core::ids::EntityKind::Character)
            .map(CharacterId)
            .map_err(|e| ToolError::failed(self.name(), e))?;
        let now = now_iso8601();
        let character = Character {
            id,
            first_name,
            family_name,
            title: opt_str_field(args, "title").map(str::to_string),
            nicknames: opt_str_list(args, "nicknames"),
            role: role.to_string(),
            description: opt_str_field(args, "description").unwrap_or_default().to_string(),
            physical_traits: opt_str_field(args, "physical_traits").unwrap_or_default().to_string(),
            personality: Personality {
                core_traits: opt_str_list(args, "core_traits"),
                fears: opt_str_list(args, "fears"),
                desires: opt_str_list(args, "desires"),
                flaws: opt_str_list(args, "flaws"),
            },
            current_state: CharacterState::default(),
            immediate_goals: opt_str_list(args, "immediate_goals"),
            arc_goal: opt_str_field(args, "arc_goal").map(str::to_string),
            story_goal: opt_str_field(args, "story_goal").map(str::to_string),
            history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        ctx.store.create_character(&character).map_err(|e| ToolError::failed(self.name(), e))?;

        let index = sd_memory::SemanticIndex::new(ctx.index);
        index.index_character(&character);

        Ok(serde_json::json!({ "id": character.id.to_string(), "display_name": character.display_name() }))
    }
}

pub struct CharacterUpdate;

impl Tool for CharacterUpdate {
    fn name(&self) -> &'static str {
        "character.update"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let id: CharacterId = crate::args::id_field(args, self.name(), "id")?;
        let mut character = ctx.store.load_character(id).map_err(|e| ToolError::failed(self.name(), e))?;

        if let Some(v) = opt_str_field(args, "emotional_state") {
            character.current_state.emotional_state = v.to_string();
        }
        if let Some(v) = opt_str_field(args, "physical_state") {
            character.current_state.physical_state = v.to_string();
        }
        if let Some(items) = args.get("inventory").and_then(|v| v.as_array()) {
            for item in items.iter().filter_map(|v| v.as_str()) {
                if !character.current_state.inventory.iter().any(|e| e == item) {
                    character.current_state.inventory.push(item.to_string());
                }
            }
        }
        if let Some(items) = args.get("goals").and_then(|v| v.as_array()) {
            for item in items.iter().filter_map(|v| v.as_str()) {
                if !character.current_state.goals.iter().any(|e| e == item) {
                    character.current_state.goals.push(item.to_string());
                }
            }
        }

        ctx.store.save_character(&mut character).map_err(|e| ToolError::failed(self.name(), e))?;
        let index = sd_memory::SemanticIndex::new(ctx.index);
        index.index_character(&character);

        Ok(serde_json::json!({ "id": character.id.to_string(), "updated": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_llm::InMemoryVectorIndex;
    use sd_store::EntityStore;
    use tempfile::tempdir;

    #[test]
    fn generate_splits_name_and_persists() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        let result = CharacterGenerate
            .execute(&ctx, &serde_json::json!({ "name": "Elena Thorne", "role": "protagonist" }))
            .unwrap();
        assert_eq!(result["id"], "C0");

        let loaded = store.load_character(CharacterId(0)).unwrap();
        assert_eq!(loaded.first_name, "Elena");
        assert_eq!(loaded.family_name, "Thorne");
    }

    #[test]
    fn generate_without_role_is_invalid_args() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        let err = CharacterGenerate.execute(&ctx, &serde_json::json!({ "name": "Elena" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { .. }));
    }

    #[test]
    fn update_merges_inventory_without_duplicates() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        CharacterGenerate.execute(&ctx, &serde_json::json!({ "name": "Elena Thorne", "role": "protagonist" })).unwrap();
        CharacterUpdate.execute(&ctx, &serde_json::json!({ "id": "C0", "inventory": ["a lantern"] })).unwrap();
        CharacterUpdate.execute(&ctx, &serde_json::json!({ "id": "C0", "inventory": ["a lantern", "a key"] })).unwrap();

        let loaded = store.load_character(CharacterId(0)).unwrap();
        assert_eq!(loaded.current_state.inventory, vec!["a lantern".to_string(), "a key".to_string()]);
    }
}
