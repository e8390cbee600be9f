//! Entity Store (§4.1): typed load/save/list over individual JSON records,
//! and the single-file aggregates rewritten atomically on each mutation.

use crate::paths::ProjectPaths;
use rustc_hash::FxHasher;
use sd_core::errors::{StoreError, StoreResult};
use sd_core::ids::{CharacterId, Counters, EntityKind, FactionId, LocationId, LoreId, SceneId};
use sd_core::model::{Character, Faction, HistoryEntry, Location, Lore, OpenLoop, PlotOutline, ProjectState, Relationship, Scene};
use sd_core::time::Tick;
use sd_core::{atomic_io, time::now_iso8601};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Stable hash of a serialized changes object, used as the
/// `(tick, scene_id, diff_hash)` duplicate-suppression key (§4.8, §8).
pub fn diff_hash(value: &serde_json::Value) -> u64 {
    let mut hasher = FxHasher::default();
    value.to_string().hash(&mut hasher);
    hasher.finish()
}

/// Merge a JSON array of strings into `list`, skipping values already
/// present. Shared by every Entity Updater list-field merge (`inventory`,
/// `goals`, `beliefs`, `features`) so the union-vs-overwrite policy (§4.8)
/// lives in one place.
pub fn union_merge_str_list(list: &mut Vec<String>, incoming: Option<&serde_json::Value>) {
    let Some(items) = incoming.and_then(|v| v.as_array()) else { return };
    for item in items {
        if let Some(s) = item.as_str() {
            if !list.iter().any(|existing| existing == s) {
                list.push(s.to_string());
            }
        }
    }
}

/// Entity Store backed by a project directory. Cheap to construct; holds
/// no in-memory cache beyond the path it was built from, so every call
/// reflects the current on-disk state (important since a crashed process
/// may have left the directory mid-tick but never mid-write, per the
/// atomic-rename guarantee).
#[derive(Debug, Clone)]
pub struct EntityStore {
    pub paths: ProjectPaths,
}

fn list_ids(dir: &Path) -> StoreResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}

impl EntityStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        EntityStore { paths: ProjectPaths::new(root) }
    }

    // ---- Counters ------------------------------------------------------

    pub fn load_counters(&self) -> StoreResult<Counters> {
        Ok(atomic_io::read_json_opt(&self.paths.counters())?.unwrap_or_default())
    }

    pub fn save_counters(&self, counters: &Counters) -> StoreResult<()> {
        atomic_io::write_json_atomic(&self.paths.counters(), counters)
    }

    /// Allocate and persist the next id of `kind` (§4.1 `next_id`).
    pub fn next_id(&self, kind: EntityKind) -> StoreResult<u32> {
        let mut counters = self.load_counters()?;
        let id = counters.next(kind);
        self.save_counters(&counters)?;
        Ok(id)
    }

    // ---- ProjectState ---------------------------------------------------

    pub fn load_state(&self) -> StoreResult<ProjectState> {
        atomic_io::read_json_opt(&self.paths.state())?
            .ok_or_else(|| StoreError::NotFound { kind: "ProjectState", id: "state.json".to_string() })
    }

    pub fn save_state(&self, state: &ProjectState) -> StoreResult<()> {
        atomic_io::write_json_atomic(&self.paths.state(), state)
    }

    // ---- Character -------------------------------------------------------

    pub fn load_character(&self, id: CharacterId) -> StoreResult<Character> {
        atomic_io::read_json_opt(&self.paths.character(id))?
            .ok_or_else(|| StoreError::NotFound { kind: "Character", id: id.to_string() })
    }

    /// Create a brand-new character record; fails with `ConflictingId` if
    /// one already exists at that id (§4.1).
    pub fn create_character(&self, character: &Character) -> StoreResult<()> {
        let path = self.paths.character(character.id);
        if path.exists() {
            return Err(StoreError::ConflictingId { kind: "Character", id: character.id.to_string() });
        }
        atomic_io::write_json_atomic(&path, character)
    }

    /// Overwrite an existing character record, refreshing `updated_at`.
    pub fn save_character(&self, character: &mut Character) -> StoreResult<()> {
        character.updated_at = now_iso8601();
        atomic_io::write_json_atomic(&self.paths.character(character.id), character)
    }

    pub fn list_characters(&self) -> StoreResult<Vec<Character>> {
        list_ids(&self.paths.characters_dir())?
            .into_iter()
            .map(|stem| atomic_io::read_json(&self.paths.characters_dir().join(format!("{stem}.json"))))
            .collect()
    }

    // ---- Location ----------------------------------------------------------

    pub fn load_location(&self, id: LocationId) -> StoreResult<Location> {
        atomic_io::read_json_opt(&self.paths.location(id))?
            .ok_or_else(|| StoreError::NotFound { kind: "Location", id: id.to_string() })
    }

    pub fn create_location(&self, location: &Location) -> StoreResult<()> {
        let path = self.paths.location(location.id);
        if path.exists() {
            return Err(StoreError::ConflictingId { kind: "Location", id: location.id.to_string() });
        }
        atomic_io::write_json_atomic(&path, location)
    }

    pub fn save_location(&self, location: &mut Location) -> StoreResult<()> {
        location.updated_at = now_iso8601();
        atomic_io::write_json_atomic(&self.paths.location(location.id), location)
    }

    pub fn list_locations(&self) -> StoreResult<Vec<Location>> {
        list_ids(&self.paths.locations_dir())?
            .into_iter()
            .map(|stem| atomic_io::read_json(&self.paths.locations_dir().join(format!("{stem}.json"))))
            .collect()
    }

    // ---- Scene ---------------------------------------------------------

    pub fn load_scene(&self, id: SceneId) -> StoreResult<Scene> {
        atomic_io::read_json_opt(&self.paths.scene_record(id))?
            .ok_or_else(|| StoreError::NotFound { kind: "Scene", id: id.to_string() })
    }

    pub fn create_scene(&self, scene: &Scene) -> StoreResult<()> {
        let path = self.paths.scene_record(scene.id);
        if path.exists() {
            return Err(StoreError::ConflictingId { kind: "Scene", id: scene.id.to_string() });
        }
        atomic_io::write_json_atomic(&path, scene)
    }

    pub fn list_scenes(&self) -> StoreResult<Vec<Scene>> {
        list_ids(&self.paths.scenes_dir())?
            .into_iter()
            .map(|stem| atomic_io::read_json(&self.paths.scenes_dir().join(format!("{stem}.json"))))
            .collect()
    }

    /// Overwrite an already-committed scene record, refreshing `updated_at`.
    /// The tick orchestrator uses this to fold in tension scoring and fact
    /// extraction results, both of which land after the scene is committed
    /// (§4.10.1 states 9-10).
    pub fn save_scene(&self, scene: &mut Scene) -> StoreResult<()> {
        scene.updated_at = now_iso8601();
        atomic_io::write_json_atomic(&self.paths.scene_record(scene.id), scene)
    }

    /// Write the prose markdown file with the required header (§6).
    pub fn write_scene_markdown(&self, id: SceneId, title: &str, prose: &str) -> StoreResult<()> {
        let body = format!("# {title}\n*Scene ID: {id}*\n---\n{prose}\n");
        atomic_io::write_atomic(&self.paths.scene_markdown(id), body.as_bytes())
    }

    pub fn scene_markdown_exists(&self, id: SceneId) -> bool {
        self.paths.scene_markdown(id).exists()
    }

    // ---- Faction ---------------------------------------------------------

    pub fn load_faction(&self, id: FactionId) -> StoreResult<Faction> {
        atomic_io::read_json_opt(&self.paths.faction(id))?
            .ok_or_else(|| StoreError::NotFound { kind: "Faction", id: id.to_string() })
    }

    pub fn create_faction(&self, faction: &Faction) -> StoreResult<()> {
        let path = self.paths.faction(faction.id);
        if path.exists() {
            return Err(StoreError::ConflictingId { kind: "Faction", id: faction.id.to_string() });
        }
        atomic_io::write_json_atomic(&path, faction)
    }

    pub fn save_faction(&self, faction: &mut Faction) -> StoreResult<()> {
        faction.updated_at = now_iso8601();
        atomic_io::write_json_atomic(&self.paths.faction(faction.id), faction)
    }

    pub fn list_factions(&self) -> StoreResult<Vec<Faction>> {
        list_ids(&self.paths.factions_dir())?
            .into_iter()
            .map(|stem| atomic_io::read_json(&self.paths.factions_dir().join(format!("{stem}.json"))))
            .collect()
    }

    // ---- Lore --------------------------------------------------------------

    pub fn load_lore(&self, id: LoreId) -> StoreResult<Lore> {
        atomic_io::read_json_opt(&self.paths.lore(id))?
            .ok_or_else(|| StoreError::NotFound { kind: "Lore", id: id.to_string() })
    }

    pub fn create_lore(&self, lore: &Lore) -> StoreResult<()> {
        let path = self.paths.lore(lore.id);
        if path.exists() {
            return Err(StoreError::ConflictingId { kind: "Lore", id: lore.id.to_string() });
        }
        atomic_io::write_json_atomic(&path, lore)
    }

    pub fn list_lore(&self) -> StoreResult<Vec<Lore>> {
        list_ids(&self.paths.lore_dir())?
            .into_iter()
            .map(|stem| atomic_io::read_json(&self.paths.lore_dir().join(format!("{stem}.json"))))
            .collect()
    }

    // ---- OpenLoop (single-file aggregate) -------------------------------

    pub fn load_open_loops(&self) -> StoreResult<Vec<OpenLoop>> {
        Ok(atomic_io::read_json_opt(&self.paths.open_loops())?.unwrap_or_default())
    }

    pub fn save_open_loops(&self, loops: &[OpenLoop]) -> StoreResult<()> {
        atomic_io::write_json_atomic(&self.paths.open_loops(), &loops)
    }

    // ---- Relationship (single-file aggregate) ---------------------------

    pub fn load_relationships(&self) -> StoreResult<Vec<Relationship>> {
        Ok(atomic_io::read_json_opt(&self.paths.relationships())?.unwrap_or_default())
    }

    pub fn save_relationships(&self, relationships: &[Relationship]) -> StoreResult<()> {
        atomic_io::write_json_atomic(&self.paths.relationships(), &relationships)
    }

    /// Append a relationship, rejecting it if either character does not
    /// exist (invariant #2: "orphaned relationships are rejected at write
    /// time").
    pub fn add_relationship(&self, relationship: Relationship) -> StoreResult<()> {
        if self.load_character(relationship.character_a).is_err() {
            return Err(StoreError::Invalid(format!(
                "relationship references nonexistent character {}",
                relationship.character_a
            )));
        }
        if self.load_character(relationship.character_b).is_err() {
            return Err(StoreError::Invalid(format!(
                "relationship references nonexistent character {}",
                relationship.character_b
            )));
        }
        let mut relationships = self.load_relationships()?;
        relationships.retain(|r| {
            !(r.character_a == relationship.character_a && r.character_b == relationship.character_b)
        });
        relationships.push(relationship);
        self.save_relationships(&relationships)
    }

    /// Order-independent lookup (§4.1): normalizes the pair at query time.
    pub fn get_relationship_between(
        &self,
        a: CharacterId,
        b: CharacterId,
    ) -> StoreResult<Option<Relationship>> {
        let (lo, hi) = sd_core::model::normalize_pair(a, b);
        Ok(self
            .load_relationships()?
            .into_iter()
            .find(|r| r.character_a == lo && r.character_b == hi))
    }

    pub fn get_character_relationships(&self, character: CharacterId) -> StoreResult<Vec<Relationship>> {
        Ok(self
            .load_relationships()?
            .into_iter()
            .filter(|r| r.involves(character))
            .collect())
    }

    // ---- PlotOutline (single-file aggregate) -----------------------------

    pub fn load_plot_outline(&self) -> StoreResult<PlotOutline> {
        Ok(atomic_io::read_json_opt(&self.paths.plot_outline())?.unwrap_or_default())
    }

    pub fn save_plot_outline(&self, outline: &PlotOutline) -> StoreResult<()> {
        atomic_io::write_json_atomic(&self.paths.plot_outline(), outline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::model::{CharacterState, Personality};
    use tempfile::tempdir;

    fn sample_character(id: CharacterId, first: &str) -> Character {
        Character {
            id,
            first_name: first.to_string(),
            family_name: "Thorne".to_string(),
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
            created_at: now_iso8601(),
            updated_at: now_iso8601(),
        }
    }

    #[test]
    fn next_id_allocates_monotonically() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        assert_eq!(store.next_id(EntityKind::Character).unwrap(), 0);
        assert_eq!(store.next_id(EntityKind::Character).unwrap(), 1);
        assert_eq!(store.next_id(EntityKind::Location).unwrap(), 0);
    }

    #[test]
    fn create_character_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let character = sample_character(CharacterId(0), "Elena");
        store.create_character(&character).unwrap();

        let loaded = store.load_character(CharacterId(0)).unwrap();
        assert_eq!(loaded.first_name, "Elena");
    }

    #[test]
    fn create_character_twice_is_conflicting_id() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let character = sample_character(CharacterId(0), "Elena");
        store.create_character(&character).unwrap();

        let err = store.create_character(&character).unwrap_err();
        assert!(matches!(err, StoreError::ConflictingId { .. }));
    }

    #[test]
    fn load_missing_character_is_not_found() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let err = store.load_character(CharacterId(99)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn add_relationship_rejects_orphan_reference() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        store.create_character(&sample_character(CharacterId(0), "Elena")).unwrap();

        let rel = Relationship::new(CharacterId(0), CharacterId(99), "allies");
        let err = store.add_relationship(rel).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn add_relationship_succeeds_when_both_characters_exist() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        store.create_character(&sample_character(CharacterId(0), "Elena")).unwrap();
        store.create_character(&sample_character(CharacterId(1), "Marcus")).unwrap();

        store.add_relationship(Relationship::new(CharacterId(1), CharacterId(0), "rivals")).unwrap();

        let found = store.get_relationship_between(CharacterId(0), CharacterId(1)).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn list_characters_returns_all_created() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        store.create_character(&sample_character(CharacterId(0), "Elena")).unwrap();
        store.create_character(&sample_character(CharacterId(1), "Marcus")).unwrap();

        let all = store.list_characters().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn scene_markdown_round_trips_with_header() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        store.write_scene_markdown(SceneId(0), "The Archive", "Elena walked in.").unwrap();
        assert!(store.scene_markdown_exists(SceneId(0)));

        let contents = fs::read_to_string(store.paths.scene_markdown(SceneId(0))).unwrap();
        assert!(contents.starts_with("# The Archive\n"));
        assert!(contents.contains("*Scene ID: S000*"));
    }
}
