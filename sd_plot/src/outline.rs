//! Plot Outline Manager (§4.9): validates a freshly generated batch of
//! beats, appends it to the persisted outline, and wraps
//! `sd_core::model::plot::PlotOutline`'s pure lifecycle queries with the
//! store I/O the orchestrator needs around them.
//!
//! Grounded on `syn_storylets/src/validation.rs`'s `validate_storylet`
//! shape: collect every defect into a `Vec` rather than stopping at the
//! first one, so the caller sees the whole batch's problems in one pass.

use std::collections::HashSet;

use sd_core::errors::StoreResult;
use sd_core::ids::{PlotBeatId, SceneId};
use sd_core::model::plot::{PlotBeat, PlotOutline};
use sd_core::time::{now_iso8601, Tick};
use sd_store::EntityStore;

use crate::errors::BeatValidationError;

pub struct OutlineManager<'a> {
    store: &'a EntityStore,
}

impl<'a> OutlineManager<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        OutlineManager { store }
    }

    pub fn load(&self) -> StoreResult<PlotOutline> {
        self.store.load_plot_outline()
    }

    /// Validate `batch` against the outline already on disk and against
    /// itself (a beat may name a prerequisite generated earlier in the
    /// same batch), then append and persist it if the whole batch is
    /// valid. On any validation failure, nothing is written (§4.9).
    pub fn add_beats(&self, batch: Vec<PlotBeat>) -> Result<PlotOutline, Vec<BeatValidationError>> {
        let mut outline = self.store.load_plot_outline().map_err(|err| vec![BeatValidationError::from(err)])?;

        let errors = self.validate_batch(&outline, &batch);
        if !errors.is_empty() {
            return Err(errors);
        }

        outline.beats.extend(batch);
        if outline.created_at.is_empty() {
            outline.created_at = now_iso8601();
        }
        outline.last_updated = now_iso8601();

        self.store.save_plot_outline(&outline).map_err(|err| vec![BeatValidationError::from(err)])?;

        Ok(outline)
    }

    fn validate_batch(&self, existing: &PlotOutline, batch: &[PlotBeat]) -> Vec<BeatValidationError> {
        let mut errors = Vec::new();

        let known_ids: HashSet<PlotBeatId> =
            existing.beats.iter().map(|b| b.id).chain(batch.iter().map(|b| b.id)).collect();
        let existing_descriptions: HashSet<&str> = existing.beats.iter().map(|b| b.description.as_str()).collect();
        let mut seen_in_batch: HashSet<&str> = HashSet::new();

        for (index, beat) in batch.iter().enumerate() {
            if beat.description.trim().is_empty() {
                errors.push(BeatValidationError::EmptyDescription { index });
            }

            if let Some(target) = beat.tension_target {
                if target > 10 {
                    errors.push(BeatValidationError::InvalidTensionTarget { index, value: target });
                }
            }

            for prereq in &beat.prerequisites {
                if !known_ids.contains(prereq) {
                    errors.push(BeatValidationError::UnknownPrerequisite { index, prerequisite: prereq.to_string() });
                }
            }

            let description = beat.description.as_str();
            if existing_descriptions.contains(description) || !seen_in_batch.insert(description) {
                errors.push(BeatValidationError::DuplicateDescription { index, description: description.to_string() });
            }
        }

        errors
    }

    /// §4.9 `get_next_beat`, resolved against the current on-disk outline.
    pub fn get_next_beat(&self) -> StoreResult<Option<PlotBeat>> {
        Ok(self.load()?.get_next_beat().cloned())
    }

    pub fn needs_regeneration(&self, threshold: usize) -> StoreResult<bool> {
        Ok(self.load()?.needs_regeneration(threshold))
    }

    /// Transition a beat to `InProgress` when the tick orchestrator picks
    /// it as this tick's target (§4.10.1 state 2 "Maybe Regenerate Beats").
    pub fn start_beat(&self, beat_id: PlotBeatId) -> StoreResult<bool> {
        let mut outline = self.load()?;
        let applied = if let Some(beat) = outline.beats.iter_mut().find(|b| b.id == beat_id) {
            if beat.status.can_transition_to(sd_core::model::plot::BeatStatus::InProgress) {
                beat.status = sd_core::model::plot::BeatStatus::InProgress;
                true
            } else {
                false
            }
        } else {
            false
        };
        if applied {
            outline.last_updated = now_iso8601();
            self.store.save_plot_outline(&outline)?;
        }
        Ok(applied)
    }

    /// Transition a beat to `Executed`, persisting the outline if the
    /// transition was legal. Returns whether it applied (§4.9, §4.10.1
    /// state 11 "Verify Beat").
    pub fn mark_beat_complete(
        &self,
        beat_id: PlotBeatId,
        scene_id: SceneId,
        notes: impl Into<String>,
        tick: Tick,
    ) -> StoreResult<bool> {
        let mut outline = self.load()?;
        let applied = outline.mark_beat_complete(beat_id, scene_id, notes, tick);
        if applied {
            outline.last_updated = now_iso8601();
            self.store.save_plot_outline(&outline)?;
        }
        Ok(applied)
    }

    /// Cooperative re-queue (§4.9): an `InProgress` beat that a failed
    /// verification should give back to the pool goes back to `Pending`
    /// rather than staying stuck.
    pub fn requeue_beat(&self, beat_id: PlotBeatId) -> StoreResult<bool> {
        let mut outline = self.load()?;
        let applied = if let Some(beat) = outline.beats.iter_mut().find(|b| b.id == beat_id) {
            if beat.status.can_transition_to(sd_core::model::plot::BeatStatus::Pending) {
                beat.status = sd_core::model::plot::BeatStatus::Pending;
                true
            } else {
                false
            }
        } else {
            false
        };
        if applied {
            outline.last_updated = now_iso8601();
            self.store.save_plot_outline(&outline)?;
        }
        Ok(applied)
    }

    /// Mark a beat `Skipped` rather than executed (§4.9, when
    /// `generation.allow_beat_skip` is set and verification keeps failing).
    pub fn skip_beat(&self, beat_id: PlotBeatId) -> StoreResult<bool> {
        let mut outline = self.load()?;
        let applied = if let Some(beat) = outline.beats.iter_mut().find(|b| b.id == beat_id) {
            if beat.status.can_transition_to(sd_core::model::plot::BeatStatus::Skipped) {
                beat.status = sd_core::model::plot::BeatStatus::Skipped;
                true
            } else {
                false
            }
        } else {
            false
        };
        if applied {
            outline.last_updated = now_iso8601();
            self.store.save_plot_outline(&outline)?;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::model::plot::BeatStatus;
    use tempfile::tempdir;

    fn draft_beat(description: &str, id: u32) -> PlotBeat {
        PlotBeat {
            id: PlotBeatId(id),
            description: description.to_string(),
            characters_involved: vec![],
            location: None,
            plot_threads: vec![],
            tension_target: Some(5),
            prerequisites: vec![],
            status: BeatStatus::Pending,
            created_at: now_iso8601(),
            executed_in_scene: None,
            execution_notes: String::new(),
            advances_character_arcs: vec![],
            resolves_loops: vec![],
            creates_loops: vec![],
        }
    }

    #[test]
    fn add_beats_persists_a_valid_batch() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);

        let outline = manager.add_beats(vec![draft_beat("the letter arrives", 0)]).unwrap();
        assert_eq!(outline.beats.len(), 1);
        assert_eq!(manager.load().unwrap().beats.len(), 1);
    }

    #[test]
    fn add_beats_rejects_empty_description_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);

        let errors = manager.add_beats(vec![draft_beat("", 0)]).unwrap_err();
        assert!(errors.contains(&BeatValidationError::EmptyDescription { index: 0 }));
        assert!(manager.load().unwrap().beats.is_empty());
    }

    #[test]
    fn add_beats_rejects_unknown_prerequisite() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);

        let mut beat = draft_beat("Elena confronts her father", 0);
        beat.prerequisites = vec![PlotBeatId(99)];
        let errors = manager.add_beats(vec![beat]).unwrap_err();
        assert!(matches!(errors[0], BeatValidationError::UnknownPrerequisite { index: 0, .. }));
    }

    #[test]
    fn add_beats_allows_prerequisite_from_the_same_batch() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);

        let first = draft_beat("the letter arrives", 0);
        let mut second = draft_beat("Elena confronts her father", 1);
        second.prerequisites = vec![PlotBeatId(0)];
        let outline = manager.add_beats(vec![first, second]).unwrap();
        assert_eq!(outline.beats.len(), 2);
    }

    #[test]
    fn add_beats_rejects_duplicate_description_against_existing_outline() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);
        manager.add_beats(vec![draft_beat("the letter arrives", 0)]).unwrap();

        let errors = manager.add_beats(vec![draft_beat("the letter arrives", 1)]).unwrap_err();
        assert!(matches!(errors[0], BeatValidationError::DuplicateDescription { .. }));
    }

    #[test]
    fn add_beats_rejects_out_of_range_tension_target() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);

        let mut beat = draft_beat("a climax", 0);
        beat.tension_target = Some(11);
        let errors = manager.add_beats(vec![beat]).unwrap_err();
        assert!(matches!(errors[0], BeatValidationError::InvalidTensionTarget { value: 11, .. }));
    }

    #[test]
    fn mark_beat_complete_persists_through_the_store() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);
        manager.add_beats(vec![draft_beat("the letter arrives", 0)]).unwrap();

        let outline = manager.load().unwrap();
        let beat_id = outline.beats[0].id;
        let applied = manager.mark_beat_complete(beat_id, SceneId(0), "delivered", Tick(1)).unwrap();
        assert!(applied);

        let reloaded = manager.load().unwrap();
        assert_eq!(reloaded.beats[0].status, BeatStatus::Executed);
    }

    #[test]
    fn requeue_beat_returns_in_progress_beat_to_pending() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let manager = OutlineManager::new(&store);
        manager.add_beats(vec![draft_beat("a confrontation", 0)]).unwrap();
        let beat_id = manager.load().unwrap().beats[0].id;

        {
            let mut outline = manager.load().unwrap();
            outline.beats[0].status = BeatStatus::InProgress;
            store.save_plot_outline(&outline).unwrap();
        }

        assert!(manager.requeue_beat(beat_id).unwrap());
        assert_eq!(manager.load().unwrap().beats[0].status, BeatStatus::Pending);
    }
}
