use crate::ids::{LoreId, SceneId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lore {
    pub id: LoreId,
    pub fact: String,
    pub category: String,
    pub importance: String,
    pub source_scene: SceneId,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}
