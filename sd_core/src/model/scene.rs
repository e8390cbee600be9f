use crate::ids::{CharacterId, LocationId, OpenLoopId, SceneId};
use crate::time::Tick;
use serde::{Deserialize, Serialize};

use super::TensionCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub tick: Tick,
    pub title: String,
    pub pov_character_id: CharacterId,
    pub location_id: LocationId,
    pub markdown_file: String,
    pub word_count: usize,
    /// 3–5 bullets.
    #[serde(default)]
    pub summary: Vec<String>,
    #[serde(default)]
    pub characters_present: Vec<CharacterId>,
    #[serde(default)]
    pub key_events: Vec<String>,
    #[serde(default)]
    pub entities_created: Vec<String>,
    #[serde(default)]
    pub entities_updated: Vec<String>,
    #[serde(default)]
    pub open_loops_created: Vec<OpenLoopId>,
    #[serde(default)]
    pub open_loops_resolved: Vec<OpenLoopId>,
    #[serde(default)]
    pub tension_level: Option<u8>,
    #[serde(default)]
    pub tension_category: Option<TensionCategory>,
    pub created_at: String,
    pub updated_at: String,
}
