//! `location.generate` and `location.update` (§4.3, §3 Location).

use crate::args::{opt_str_field, opt_str_list, str_field};
use crate::errors::{ToolError, ToolResult};
use crate::registry::{Tool, ToolContext};
use sd_core::ids::LocationId;
use sd_core::model::{Location, LocationState, SensoryDetails};
use sd_core::time::now_iso8601;

pub struct LocationGenerate;

impl Tool for LocationGenerate {
    fn name(&self) -> &'static str {
        "location.generate"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let name = str_field(args, self.name(), "name")?;

        let id = ctx
            .store
            .next_id(sd_core::ids::EntityKind::Location)
            .map(LocationId)
            .map_err(|e| ToolError::failed(self.name(), e))?;
        let now = now_iso8601();
        let location = Location {
            id,
            name: name.to_string(),
            aliases: opt_str_list(args, "aliases"),
            description: opt_str_field(args, "description").unwrap_or_default().to_string(),
            atmosphere: opt_str_field(args, "atmosphere").unwrap_or_default().to_string(),
            sensory_details: SensoryDetails {
                visual: opt_str_field(args, "visual").unwrap_or_default().to_string(),
                auditory: opt_str_field(args, "auditory").unwrap_or_default().to_string(),
                olfactory: opt_str_field(args, "olfactory").unwrap_or_default().to_string(),
                tactile: opt_str_field(args, "tactile").unwrap_or_default().to_string(),
            },
            features: opt_str_list(args, "features"),
            connections: Vec::new(),
            current_state: LocationState::default(),
            significance: opt_str_field(args, "significance").unwrap_or_default().to_string(),
            history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        ctx.store.create_location(&location).map_err(|e| ToolError::failed(self.name(), e))?;

        let index = sd_memory::SemanticIndex::new(ctx.index);
        index.index_location(&location);

        Ok(serde_json::json!({ "id": location.id.to_string(), "name": location.name }))
    }
}

pub struct LocationUpdate;

impl Tool for LocationUpdate {
    fn name(&self) -> &'static str {
        "location.update"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let id: LocationId = crate::args::id_field(args, self.name(), "id")?;
        let mut location = ctx.store.load_location(id).map_err(|e| ToolError::failed(self.name(), e))?;

        if let Some(v) = opt_str_field(args, "description") {
            location.description = v.to_string();
        }
        if let Some(v) = opt_str_field(args, "atmosphere") {
            location.atmosphere = v.to_string();
        }
        if let Some(items) = args.get("features").and_then(|v| v.as_array()) {
            for item in items.iter().filter_map(|v| v.as_str()) {
                if !location.features.iter().any(|e| e == item) {
                    location.features.push(item.to_string());
                }
            }
        }
        if let Some(tension) = crate::args::opt_u8_field(args, "tension_level") {
            location.current_state.set_tension(tension);
        }

        ctx.store.save_location(&mut location).map_err(|e| ToolError::failed(self.name(), e))?;
        let index = sd_memory::SemanticIndex::new(ctx.index);
        index.index_location(&location);

        Ok(serde_json::json!({ "id": location.id.to_string(), "updated": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_llm::InMemoryVectorIndex;
    use sd_store::EntityStore;
    use tempfile::tempdir;

    #[test]
    fn generate_then_update_merges_features() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        LocationGenerate.execute(&ctx, &serde_json::json!({ "name": "The Archive" })).unwrap();
        LocationUpdate
            .execute(&ctx, &serde_json::json!({ "id": "L0", "features": ["a locked cabinet"] }))
            .unwrap();

        let loaded = store.load_location(LocationId(0)).unwrap();
        assert_eq!(loaded.features, vec!["a locked cabinet".to_string()]);
    }

    #[test]
    fn update_clamps_tension_to_ten() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        LocationGenerate.execute(&ctx, &serde_json::json!({ "name": "The Archive" })).unwrap();
        LocationUpdate.execute(&ctx, &serde_json::json!({ "id": "L0", "tension_level": 99 })).unwrap();

        let loaded = store.load_location(LocationId(0)).unwrap();
        assert_eq!(loaded.current_state.tension_level, 10);
    }
}
