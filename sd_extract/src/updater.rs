//! Entity Updater (§4.8): applies a fact-extraction result to the Entity
//! Store. List fields are union-merged, scalars overwritten, every applied
//! change appends a deduplicated history entry. POV-switch detection
//! (invariant #7) is handled here rather than in the Extractor, since it is
//! an apply-time decision about *which* record a character update lands on.
//!
//! Grounded on the teacher's `apply_storylet_outcome` shape: diff the
//! proposed changes against the current record, apply them, then record
//! what happened — rather than replacing the record wholesale.

use sd_core::errors::{ConsistencyWarning, StoreResult};
use sd_core::ids::{CharacterId, EntityKind, LoreId, OpenLoopId};
use sd_core::model::{Character, HistoryEntry, Importance, Location, Lore, OpenLoop, OpenLoopStatus, Relationship};
use sd_core::time::{now_iso8601, Tick};
use sd_core::ids::SceneId;
use sd_llm::VectorIndex;
use sd_memory::SemanticIndex;
use sd_store::{diff_hash, union_merge_str_list, EntityStore};
use sd_tools::tools::split_name;

use crate::extractor::ExtractedFacts;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub characters_updated: u32,
    pub characters_created: u32,
    pub locations_updated: u32,
    pub loops_created: u32,
    pub loops_resolved: u32,
    pub relationships_updated: u32,
}

/// Result of a full `Updater::apply` pass: the statistics §4.8 specifies,
/// any non-fatal warnings raised along the way, and the new active
/// character if a POV switch was detected.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub stats: UpdateStats,
    pub warnings: Vec<ConsistencyWarning>,
    pub new_active_character: Option<CharacterId>,
}

pub struct Updater<'a> {
    store: &'a EntityStore,
    index: &'a dyn VectorIndex,
}

impl<'a> Updater<'a> {
    pub fn new(store: &'a EntityStore, index: &'a dyn VectorIndex) -> Self {
        Updater { store, index }
    }

    /// Apply every section of `facts` for the scene just committed at
    /// `scene_id`/`tick`. `pov_character_id`/`pov_character_name` are the
    /// writer context's POV fields, used to detect a POV switch (§4.8,
    /// §8 invariant #8, Scenario B).
    pub fn apply(
        &self,
        tick: Tick,
        scene_id: SceneId,
        pov_character_id: CharacterId,
        pov_character_name: &str,
        facts: &ExtractedFacts,
    ) -> StoreResult<UpdateOutcome> {
        let mut outcome = UpdateOutcome::default();
        let semantic = SemanticIndex::new(self.index);

        for update in &facts.character_updates {
            let Ok(id) = update.id.parse::<CharacterId>() else {
                tracing::warn!(id = %update.id, "character update names an unparseable id, skipping");
                continue;
            };

            if id == pov_character_id {
                let stored = match self.store.load_character(id) {
                    Ok(c) => c,
                    Err(err) => {
                        tracing::warn!(%id, error = %err, "pov character update references a missing character");
                        continue;
                    }
                };
                if stored.name_mismatches(pov_character_name) {
                    let new_id = self.allocate_pov_switch_character(pov_character_name, &update.changes, tick, scene_id)?;
                    semantic.index_character(&self.store.load_character(new_id)?);
                    outcome.stats.characters_created += 1;
                    outcome.new_active_character = Some(new_id);
                    continue;
                }
            }

            match self.store.load_character(id) {
                Ok(mut character) => {
                    let changed = apply_character_changes(&mut character, &update.changes, tick, scene_id);
                    if changed {
                        self.store.save_character(&mut character)?;
                        semantic.index_character(&character);
                        outcome.stats.characters_updated += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(%id, error = %err, "character update references a missing character");
                }
            }
        }

        for update in &facts.location_updates {
            let Ok(id) = update.id.parse::<sd_core::ids::LocationId>() else {
                tracing::warn!(id = %update.id, "location update names an unparseable id, skipping");
                continue;
            };
            match self.store.load_location(id) {
                Ok(mut location) => {
                    let changed = apply_location_changes(&mut location, &update.changes, tick, scene_id);
                    if changed {
                        self.store.save_location(&mut location)?;
                        semantic.index_location(&location);
                        outcome.stats.locations_updated += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(%id, error = %err, "location update references a missing location");
                }
            }
        }

        if !facts.open_loops_created.is_empty() || !facts.open_loops_resolved.is_empty() {
            let mut loops = self.store.load_open_loops()?;

            for created in &facts.open_loops_created {
                let id = OpenLoopId(self.store.next_id(EntityKind::OpenLoop)?);
                let importance = created
                    .importance
                    .as_deref()
                    .and_then(parse_importance)
                    .unwrap_or(Importance::Medium);
                let related_characters = created
                    .related_characters
                    .iter()
                    .filter_map(|s| s.parse::<CharacterId>().ok())
                    .collect();
                let related_locations = created
                    .related_locations
                    .iter()
                    .filter_map(|s| s.parse::<sd_core::ids::LocationId>().ok())
                    .collect();
                loops.push(OpenLoop {
                    id,
                    description: created.description.clone(),
                    importance,
                    category: created.category.clone(),
                    status: OpenLoopStatus::Open,
                    created_in_scene: scene_id,
                    resolved_in_scene: None,
                    resolution_summary: None,
                    related_characters,
                    related_locations,
                    scenes_mentioned: 1,
                    last_mentioned_tick: Some(tick),
                    is_story_goal: false,
                });
                outcome.stats.loops_created += 1;
            }

            for loop_id in &facts.open_loops_resolved {
                let Ok(id) = loop_id.parse::<OpenLoopId>() else {
                    tracing::warn!(id = %loop_id, "open loop resolution names an unparseable id, skipping");
                    continue;
                };
                if let Some(found) = loops.iter_mut().find(|l| l.id == id) {
                    found.resolve(scene_id, format!("resolved in scene {scene_id}"));
                    outcome.stats.loops_resolved += 1;
                } else {
                    tracing::warn!(%id, "open loop resolution references an unknown loop");
                }
            }

            self.store.save_open_loops(&loops)?;
        }

        if !facts.relationship_changes.is_empty() {
            let mut relationships = self.store.load_relationships()?;

            for change in &facts.relationship_changes {
                let (Ok(a), Ok(b)) = (change.character_a.parse::<CharacterId>(), change.character_b.parse::<CharacterId>()) else {
                    tracing::warn!("relationship change names an unparseable character id, skipping");
                    continue;
                };
                if self.store.load_character(a).is_err() {
                    outcome.warnings.push(ConsistencyWarning::OrphanRelationshipReference { character_id: a.to_string() });
                    continue;
                }
                if self.store.load_character(b).is_err() {
                    outcome.warnings.push(ConsistencyWarning::OrphanRelationshipReference { character_id: b.to_string() });
                    continue;
                }

                let (lo, hi) = sd_core::model::normalize_pair(a, b);
                match relationships.iter_mut().find(|r| r.character_a == lo && r.character_b == hi) {
                    Some(relationship) => {
                        apply_relationship_change(relationship, change, tick);
                        outcome.stats.relationships_updated += 1;
                    }
                    None => {
                        let mut relationship = Relationship::new(a, b, "associates");
                        apply_relationship_change(&mut relationship, change, tick);
                        relationships.push(relationship);
                        outcome.stats.relationships_updated += 1;
                    }
                }
            }

            self.store.save_relationships(&relationships)?;
        }

        for lore_fact in &facts.lore {
            let id = LoreId(self.store.next_id(EntityKind::Lore)?);
            let now = now_iso8601();
            let lore = Lore {
                id,
                fact: lore_fact.fact.clone(),
                category: lore_fact.category.clone(),
                importance: lore_fact.importance.clone().unwrap_or_else(|| "minor".to_string()),
                source_scene: scene_id,
                tags: lore_fact.tags.clone(),
                created_at: now.clone(),
                updated_at: now,
            };
            self.store.create_lore(&lore)?;
            semantic.index_lore(&lore);
        }

        Ok(outcome)
    }

    /// POV-switch: allocate a new Character from `new_name`, seed its
    /// `current_state` from the proposed changes, and persist it. The old
    /// character is left untouched — `first_name`/`family_name` must not
    /// change (§8 invariant #8).
    fn allocate_pov_switch_character(
        &self,
        new_name: &str,
        changes: &serde_json::Value,
        tick: Tick,
        scene_id: SceneId,
    ) -> StoreResult<CharacterId> {
        let (first_name, family_name) = split_name(new_name);
        let id = CharacterId(self.store.next_id(EntityKind::Character)?);
        let now = now_iso8601();
        let mut character = Character {
            id,
            first_name,
            family_name,
            title: None,
            nicknames: Vec::new(),
            role: "protagonist".to_string(),
            description: String::new(),
            physical_traits: String::new(),
            personality: Default::default(),
            current_state: Default::default(),
            immediate_goals: Vec::new(),
            arc_goal: None,
            story_goal: None,
            history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        apply_character_changes(&mut character, changes, tick, scene_id);
        self.store.create_character(&character)?;
        Ok(id)
    }
}

fn parse_importance(raw: &str) -> Option<Importance> {
    match raw.to_ascii_lowercase().as_str() {
        "low" => Some(Importance::Low),
        "medium" => Some(Importance::Medium),
        "high" => Some(Importance::High),
        "critical" => Some(Importance::Critical),
        _ => None,
    }
}

/// Apply a character `changes` object: scalar overwrite, list union-merge,
/// deduplicated history append. Returns whether anything was actually
/// applied (an empty/no-op `changes` object still counts as "touched" if
/// it carries a new diff hash not seen before; a previously-seen diff is
/// not re-recorded per the idempotence law in §8, but `character_updates`
/// referencing the id is itself enough to count as an update).
fn apply_character_changes(character: &mut Character, changes: &serde_json::Value, tick: Tick, scene_id: SceneId) -> bool {
    if let Some(v) = changes.get("emotional_state").and_then(|v| v.as_str()) {
        character.current_state.emotional_state = v.to_string();
    }
    if let Some(v) = changes.get("physical_state").and_then(|v| v.as_str()) {
        character.current_state.physical_state = v.to_string();
    }
    union_merge_str_list(&mut character.current_state.inventory, changes.get("inventory"));
    union_merge_str_list(&mut character.current_state.goals, changes.get("goals"));
    union_merge_str_list(&mut character.current_state.beliefs, changes.get("beliefs"));

    append_history(&mut character.history, changes, tick, scene_id);
    true
}

fn apply_location_changes(location: &mut Location, changes: &serde_json::Value, tick: Tick, scene_id: SceneId) -> bool {
    if let Some(v) = changes.get("description").and_then(|v| v.as_str()) {
        location.description = v.to_string();
    }
    if let Some(v) = changes.get("atmosphere").and_then(|v| v.as_str()) {
        location.atmosphere = v.to_string();
    }
    union_merge_str_list(&mut location.features, changes.get("features"));

    append_history(&mut location.history, changes, tick, scene_id);
    true
}

/// Shared history-append helper: suppresses a duplicate `(tick, scene_id,
/// diff_hash)` entry (§8 idempotence law) while still allowing a genuinely
/// new diff at the same tick (e.g. a second extracted fact in one scene).
fn append_history(history: &mut Vec<HistoryEntry>, changes: &serde_json::Value, tick: Tick, scene_id: SceneId) {
    let hash = diff_hash(changes);
    if history.iter().any(|h| h.tick == tick && h.scene_id == scene_id && h.diff_hash == hash) {
        return;
    }
    history.push(HistoryEntry { tick, scene_id, changes: changes.clone(), summary: summarize_changes(changes), diff_hash: hash });
}

fn summarize_changes(changes: &serde_json::Value) -> String {
    let Some(obj) = changes.as_object() else { return "updated".to_string() };
    if obj.is_empty() {
        return "no-op update".to_string();
    }
    let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    format!("updated {}", keys.join(", "))
}

fn apply_relationship_change(relationship: &mut Relationship, change: &crate::extractor::RelationshipChangeFact, tick: Tick) {
    if let Some(status) = &change.status {
        relationship.status = status.clone();
    }
    if let Some(intensity) = change.intensity {
        relationship.set_intensity(intensity);
    }
    if let Some(event) = &change.event {
        relationship.history.push(sd_core::model::RelationshipHistoryEntry { tick, event: event.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{CharacterUpdateFact, LoreFact, OpenLoopCreateFact, RelationshipChangeFact};
    use sd_core::model::{CharacterState, Personality};
    use sd_llm::InMemoryVectorIndex;
    use tempfile::tempdir;

    fn make_character(store: &EntityStore, first: &str, family: &str) -> CharacterId {
        let id = CharacterId(store.next_id(EntityKind::Character).unwrap());
        let now = now_iso8601();
        store
            .create_character(&Character {
                id,
                first_name: first.to_string(),
                family_name: family.to_string(),
                title: None,
                nicknames: vec![],
                role: "protagonist".to_string(),
                description: String::new(),
                physical_traits: String::new(),
                personality: Personality::default(),
                current_state: CharacterState::default(),
                immediate_goals: vec![],
                arc_goal: None,
                story_goal: None,
                history: vec![],
                created_at: now.clone(),
                updated_at: now,
            })
            .unwrap();
        id
    }

    #[test]
    fn union_merges_inventory_without_duplicating() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let index = InMemoryVectorIndex::new();
        let c0 = make_character(&store, "Elena", "Thorne");

        let updater = Updater::new(&store, &index);
        let facts = ExtractedFacts {
            character_updates: vec![CharacterUpdateFact { id: c0.to_string(), changes: serde_json::json!({"inventory": ["a brass key"]}) }],
            ..Default::default()
        };
        updater.apply(Tick(1), SceneId(0), c0, "Elena", &facts).unwrap();
        updater.apply(Tick(2), SceneId(1), c0, "Elena", &facts).unwrap();

        let loaded = store.load_character(c0).unwrap();
        assert_eq!(loaded.current_state.inventory, vec!["a brass key".to_string()]);
        assert_eq!(loaded.history.len(), 2);
    }

    #[test]
    fn duplicate_diff_in_same_scene_does_not_duplicate_history() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let index = InMemoryVectorIndex::new();
        let c0 = make_character(&store, "Elena", "Thorne");

        let updater = Updater::new(&store, &index);
        let facts = ExtractedFacts {
            character_updates: vec![CharacterUpdateFact { id: c0.to_string(), changes: serde_json::json!({"emotional_state": "anxious"}) }],
            ..Default::default()
        };
        updater.apply(Tick(1), SceneId(0), c0, "Elena", &facts).unwrap();
        updater.apply(Tick(1), SceneId(0), c0, "Elena", &facts).unwrap();

        let loaded = store.load_character(c0).unwrap();
        assert_eq!(loaded.history.len(), 1);
    }

    #[test]
    fn pov_switch_allocates_new_character_and_preserves_old() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let index = InMemoryVectorIndex::new();
        let c0 = make_character(&store, "Elena", "Thorne");

        let updater = Updater::new(&store, &index);
        let facts = ExtractedFacts {
            character_updates: vec![CharacterUpdateFact { id: c0.to_string(), changes: serde_json::json!({"emotional_state": "anxious"}) }],
            ..Default::default()
        };
        let outcome = updater.apply(Tick(3), SceneId(2), c0, "Marcus Vale", &facts).unwrap();

        assert_eq!(outcome.stats.characters_created, 1);
        let new_id = outcome.new_active_character.expect("pov switch should report a new active character");
        assert_ne!(new_id, c0);

        let new_character = store.load_character(new_id).unwrap();
        assert_eq!(new_character.first_name, "Marcus");
        assert_eq!(new_character.current_state.emotional_state, "anxious");

        let old_character = store.load_character(c0).unwrap();
        assert_eq!(old_character.first_name, "Elena");
        assert_eq!(old_character.family_name, "Thorne");
    }

    #[test]
    fn open_loop_created_then_resolved() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let index = InMemoryVectorIndex::new();
        let c0 = make_character(&store, "Elena", "Thorne");
        let updater = Updater::new(&store, &index);

        let create_facts = ExtractedFacts {
            open_loops_created: vec![OpenLoopCreateFact {
                description: "who sent the letter".to_string(),
                importance: Some("high".to_string()),
                category: "mystery".to_string(),
                related_characters: vec![],
                related_locations: vec![],
            }],
            ..Default::default()
        };
        let outcome = updater.apply(Tick(1), SceneId(0), c0, "Elena", &create_facts).unwrap();
        assert_eq!(outcome.stats.loops_created, 1);

        let loops = store.load_open_loops().unwrap();
        let loop_id = loops[0].id;

        let resolve_facts = ExtractedFacts { open_loops_resolved: vec![loop_id.to_string()], ..Default::default() };
        let outcome = updater.apply(Tick(2), SceneId(1), c0, "Elena", &resolve_facts).unwrap();
        assert_eq!(outcome.stats.loops_resolved, 1);

        let loops = store.load_open_loops().unwrap();
        assert_eq!(loops[0].status, OpenLoopStatus::Resolved);
        assert_eq!(loops[0].resolved_in_scene, Some(SceneId(1)));
    }

    #[test]
    fn relationship_change_on_missing_character_is_warning_only() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let index = InMemoryVectorIndex::new();
        let c0 = make_character(&store, "Elena", "Thorne");
        let updater = Updater::new(&store, &index);

        let facts = ExtractedFacts {
            relationship_changes: vec![RelationshipChangeFact {
                character_a: c0.to_string(),
                character_b: "C999".to_string(),
                status: Some("rivals".to_string()),
                event: None,
                intensity: None,
            }],
            ..Default::default()
        };
        let outcome = updater.apply(Tick(1), SceneId(0), c0, "Elena", &facts).unwrap();
        assert_eq!(outcome.stats.relationships_updated, 0);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(outcome.warnings[0], ConsistencyWarning::OrphanRelationshipReference { .. }));
    }

    #[test]
    fn lore_fact_is_created_and_indexed() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let index = InMemoryVectorIndex::new();
        let c0 = make_character(&store, "Elena", "Thorne");
        let updater = Updater::new(&store, &index);

        let facts = ExtractedFacts {
            lore: vec![LoreFact { fact: "the war ended a century ago".to_string(), category: "history".to_string(), importance: Some("minor".to_string()), tags: vec![] }],
            ..Default::default()
        };
        updater.apply(Tick(1), SceneId(0), c0, "Elena", &facts).unwrap();

        let lore = store.list_lore().unwrap();
        assert_eq!(lore.len(), 1);
        assert_eq!(lore[0].fact, "the war ended a century ago");
    }
}
