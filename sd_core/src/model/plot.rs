use crate::ids::{CharacterId, LocationId, OpenLoopId, PlotBeatId, SceneId};
use crate::time::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatStatus {
    Pending,
    InProgress,
    Executed,
    Skipped,
}

impl BeatStatus {
    /// Whether `self -> next` is a legal beat lifecycle transition (§4.9).
    pub fn can_transition_to(self, next: BeatStatus) -> bool {
        use BeatStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Skipped)
                | (InProgress, Executed)
                | (InProgress, Skipped)
                | (InProgress, Pending) // cooperative re-queue, e.g. beat verification failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotBeat {
    pub id: PlotBeatId,
    pub description: String,
    #[serde(default)]
    pub characters_involved: Vec<CharacterId>,
    #[serde(default)]
    pub location: Option<LocationId>,
    #[serde(default)]
    pub plot_threads: Vec<String>,
    #[serde(default)]
    pub tension_target: Option<u8>,
    #[serde(default)]
    pub prerequisites: Vec<PlotBeatId>,
    pub status: BeatStatus,
    pub created_at: String,
    #[serde(default)]
    pub executed_in_scene: Option<SceneId>,
    #[serde(default)]
    pub execution_notes: String,
    #[serde(default)]
    pub advances_character_arcs: Vec<CharacterId>,
    #[serde(default)]
    pub resolves_loops: Vec<OpenLoopId>,
    #[serde(default)]
    pub creates_loops: Vec<OpenLoopId>,
}

impl PlotBeat {
    /// Invariant #4 reduced to a single beat: an executed beat always
    /// names the scene that executed it.
    pub fn respects_execution_invariant(&self) -> bool {
        self.status != BeatStatus::Executed || self.executed_in_scene.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotOutline {
    pub beats: Vec<PlotBeat>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub current_arc: String,
    #[serde(default)]
    pub arc_progress: f32,
}

impl PlotOutline {
    /// First beat with `status=pending` whose prerequisites are all
    /// `executed` (§4.9 `get_next_beat`).
    pub fn get_next_beat(&self) -> Option<&PlotBeat> {
        self.beats.iter().find(|b| {
            b.status == BeatStatus::Pending
                && b.prerequisites.iter().all(|prereq_id| {
                    self.beats
                        .iter()
                        .find(|candidate| candidate.id == *prereq_id)
                        .map(|candidate| candidate.status == BeatStatus::Executed)
                        .unwrap_or(false)
                })
        })
    }

    /// Count of pending beats whose prerequisites are already satisfied.
    pub fn pending_ready_count(&self) -> usize {
        self.beats
            .iter()
            .filter(|b| {
                b.status == BeatStatus::Pending
                    && b.prerequisites.iter().all(|prereq_id| {
                        self.beats
                            .iter()
                            .find(|candidate| candidate.id == *prereq_id)
                            .map(|candidate| candidate.status == BeatStatus::Executed)
                            .unwrap_or(false)
                    })
            })
            .count()
    }

    /// True when `pending_ready_count < threshold` (§8 boundary behavior:
    /// at exactly `threshold` it does not trigger).
    pub fn needs_regeneration(&self, threshold: usize) -> bool {
        self.pending_ready_count() < threshold
    }

    pub fn mark_beat_complete(&mut self, beat_id: PlotBeatId, scene_id: SceneId, notes: impl Into<String>, tick: Tick) -> bool {
        let _ = tick;
        if let Some(beat) = self.beats.iter_mut().find(|b| b.id == beat_id) {
            if beat.status.can_transition_to(BeatStatus::Executed) {
                beat.status = BeatStatus::Executed;
                beat.executed_in_scene = Some(scene_id);
                beat.execution_notes = notes.into();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat(id: u32, status: BeatStatus, prereqs: Vec<u32>) -> PlotBeat {
        PlotBeat {
            id: PlotBeatId(id),
            description: format!("beat {id}"),
            characters_involved: vec![],
            location: None,
            plot_threads: vec![],
            tension_target: None,
            prerequisites: prereqs.into_iter().map(PlotBeatId).collect(),
            status,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            executed_in_scene: None,
            execution_notes: String::new(),
            advances_character_arcs: vec![],
            resolves_loops: vec![],
            creates_loops: vec![],
        }
    }

    #[test]
    fn get_next_beat_skips_beats_with_unmet_prerequisites() {
        let outline = PlotOutline {
            beats: vec![
                beat(1, BeatStatus::Pending, vec![2]),
                beat(2, BeatStatus::Pending, vec![]),
            ],
            ..Default::default()
        };
        let next = outline.get_next_beat().unwrap();
        assert_eq!(next.id, PlotBeatId(2));
    }

    #[test]
    fn get_next_beat_returns_beat_once_prerequisite_executed() {
        let outline = PlotOutline {
            beats: vec![
                beat(1, BeatStatus::Pending, vec![2]),
                beat(2, BeatStatus::Executed, vec![]),
            ],
            ..Default::default()
        };
        assert_eq!(outline.get_next_beat().unwrap().id, PlotBeatId(1));
    }

    #[test]
    fn needs_regeneration_boundary_at_threshold_does_not_trigger() {
        let outline = PlotOutline {
            beats: vec![beat(1, BeatStatus::Pending, vec![]), beat(2, BeatStatus::Pending, vec![])],
            ..Default::default()
        };
        assert!(!outline.needs_regeneration(2));
        assert!(outline.needs_regeneration(3));
    }

    #[test]
    fn mark_beat_complete_transitions_and_fills_scene() {
        let mut outline = PlotOutline {
            beats: vec![beat(1, BeatStatus::InProgress, vec![])],
            ..Default::default()
        };
        let ok = outline.mark_beat_complete(PlotBeatId(1), SceneId(3), "did it", Tick(3));
        assert!(ok);
        let b = &outline.beats[0];
        assert_eq!(b.status, BeatStatus::Executed);
        assert_eq!(b.executed_in_scene, Some(SceneId(3)));
        assert!(b.respects_execution_invariant());
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut outline = PlotOutline {
            beats: vec![beat(1, BeatStatus::Skipped, vec![])],
            ..Default::default()
        };
        let ok = outline.mark_beat_complete(PlotBeatId(1), SceneId(3), "nope", Tick(3));
        assert!(!ok, "skipped beats cannot transition to executed");
    }
}
