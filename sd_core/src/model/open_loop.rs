use crate::ids::{CharacterId, LocationId, OpenLoopId, SceneId};
use crate::time::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenLoopStatus {
    Open,
    Resolved,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLoop {
    pub id: OpenLoopId,
    pub description: String,
    pub importance: Importance,
    pub category: String,
    pub status: OpenLoopStatus,
    pub created_in_scene: SceneId,
    #[serde(default)]
    pub resolved_in_scene: Option<SceneId>,
    #[serde(default)]
    pub resolution_summary: Option<String>,
    #[serde(default)]
    pub related_characters: Vec<CharacterId>,
    #[serde(default)]
    pub related_locations: Vec<LocationId>,
    #[serde(default)]
    pub scenes_mentioned: u32,
    #[serde(default)]
    pub last_mentioned_tick: Option<Tick>,
    #[serde(default)]
    pub is_story_goal: bool,
}

impl OpenLoop {
    /// Invariant #5 in §8 reduced to a single OpenLoop: a resolved loop
    /// always names the scene that resolved it.
    pub fn respects_resolution_invariant(&self) -> bool {
        self.status != OpenLoopStatus::Resolved || self.resolved_in_scene.is_some()
    }

    pub fn resolve(&mut self, scene_id: SceneId, summary: impl Into<String>) {
        self.status = OpenLoopStatus::Resolved;
        self.resolved_in_scene = Some(scene_id);
        self.resolution_summary = Some(summary.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OpenLoop {
        OpenLoop {
            id: OpenLoopId(0),
            description: "Who sent the letter?".to_string(),
            importance: Importance::High,
            category: "mystery".to_string(),
            status: OpenLoopStatus::Open,
            created_in_scene: SceneId(0),
            resolved_in_scene: None,
            resolution_summary: None,
            related_characters: vec![],
            related_locations: vec![],
            scenes_mentioned: 1,
            last_mentioned_tick: None,
            is_story_goal: false,
        }
    }

    #[test]
    fn open_loop_without_resolution_is_valid() {
        assert!(sample().respects_resolution_invariant());
    }

    #[test]
    fn resolving_fills_resolved_in_scene() {
        let mut loop_ = sample();
        loop_.resolve(SceneId(5), "The butler confessed.");
        assert!(loop_.respects_resolution_invariant());
        assert_eq!(loop_.resolved_in_scene, Some(SceneId(5)));
    }

    #[test]
    fn importance_orders_low_to_critical() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::Medium < Importance::High);
        assert!(Importance::High < Importance::Critical);
    }
}
