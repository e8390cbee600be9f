//! `faction.generate`, `faction.update`, `faction.query` (§4.3, §3 Faction).

use crate::args::{opt_str_field, opt_str_list, str_field};
use crate::errors::{ToolError, ToolResult};
use crate::registry::{Tool, ToolContext};
use sd_core::ids::FactionId;
use sd_core::model::Faction;
use sd_core::time::now_iso8601;
use std::collections::HashMap;

pub struct FactionGenerate;

impl Tool for FactionGenerate {
    fn name(&self) -> &'static str {
        "faction.generate"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let name = str_field(args, self.name(), "name")?;
        let kind = opt_str_field(args, "type").unwrap_or("organization").to_string();

        let id = ctx
            .store
            .next_id(sd_core::ids::EntityKind::Faction)
            .map(FactionId)
            .map_err(|e| ToolError::failed(self.name(), e))?;
        let now = now_iso8601();
        let faction = Faction {
            id,
            name: name.to_string(),
            kind,
            summary: opt_str_field(args, "summary").unwrap_or_default().to_string(),
            mandate_objectives: opt_str_list(args, "mandate_objectives"),
            influence_domains: opt_str_list(args, "influence_domains"),
            assets_resources: opt_str_list(args, "assets_resources"),
            methods_tactics: opt_str_list(args, "methods_tactics"),
            stance_by_character: HashMap::new(),
            relationships: opt_str_list(args, "relationships"),
            importance: opt_str_field(args, "importance").unwrap_or_default().to_string(),
            tags: opt_str_list(args, "tags"),
            created_at: now.clone(),
            updated_at: now,
        };
        ctx.store.create_faction(&faction).map_err(|e| ToolError::failed(self.name(), e))?;

        let index = sd_memory::SemanticIndex::new(ctx.index);
        index.index_faction(&faction);

        Ok(serde_json::json!({ "id": faction.id.to_string(), "name": faction.name }))
    }
}

pub struct FactionUpdate;

impl Tool for FactionUpdate {
    fn name(&self) -> &'static str {
        "faction.update"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let id: FactionId = crate::args::id_field(args, self.name(), "id")?;
        let mut faction = ctx.store.load_faction(id).map_err(|e| ToolError::failed(self.name(), e))?;

        if let Some(v) = opt_str_field(args, "summary") {
            faction.summary = v.to_string();
        }
        if let Some(items) = args.get("methods_tactics").and_then(|v| v.as_array()) {
            for item in items.iter().filter_map(|v| v.as_str()) {
                if !faction.methods_tactics.iter().any(|e| e == item) {
                    faction.methods_tactics.push(item.to_string());
                }
            }
        }
        if let Some(stance) = args.get("stance").and_then(|v| v.as_object()) {
            for (character_id, value) in stance {
                if let (Ok(cid), Some(stance_text)) = (character_id.parse(), value.as_str()) {
                    faction.stance_by_character.insert(cid, stance_text.to_string());
                }
            }
        }

        ctx.store.save_faction(&mut faction).map_err(|e| ToolError::failed(self.name(), e))?;
        let index = sd_memory::SemanticIndex::new(ctx.index);
        index.index_faction(&faction);

        Ok(serde_json::json!({ "id": faction.id.to_string(), "updated": true }))
    }
}

pub struct FactionQuery;

impl Tool for FactionQuery {
    fn name(&self) -> &'static str {
        "faction.query"
    }

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        if let Some(id_raw) = opt_str_field(args, "id") {
            let id: FactionId =
                id_raw.parse().map_err(|_| ToolError::invalid(self.name(), format!("invalid faction id: {id_raw}")))?;
            let faction = ctx.store.load_faction(id).map_err(|e| ToolError::failed(self.name(), e))?;
            return Ok(serde_json::json!({ "faction": faction }));
        }
        let all = ctx.store.list_factions().map_err(|e| ToolError::failed(self.name(), e))?;
        Ok(serde_json::json!({ "factions": all }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_llm::InMemoryVectorIndex;
    use sd_store::EntityStore;
    use tempfile::tempdir;

    #[test]
    fn generate_then_update_stance() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        FactionGenerate.execute(&ctx, &serde_json::json!({ "name": "The Archivists", "type": "guild" })).unwrap();
        FactionUpdate
            .execute(&ctx, &serde_json::json!({ "id": "F0", "stance": { "C0": "wary" } }))
            .unwrap();

        let faction = store.load_faction(FactionId(0)).unwrap();
        assert_eq!(faction.stance_by_character.get(&sd_core::ids::CharacterId(0)), Some(&"wary".to_string()));
    }

    #[test]
    fn query_without_id_lists_all() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };

        FactionGenerate.execute(&ctx, &serde_json::json!({ "name": "The Archivists" })).unwrap();
        let result = FactionQuery.execute(&ctx, &serde_json::json!({})).unwrap();
        assert_eq!(result["factions"].as_array().unwrap().len(), 1);
    }
}
