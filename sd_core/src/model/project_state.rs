use crate::ids::CharacterId;
use crate::model::TensionCategory;
use crate::time::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryFoundation {
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub premise: String,
    #[serde(default)]
    pub protagonist_archetype: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub primary_goal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryStoryGoal {
    pub description: String,
    pub source: String,
    pub promoted_at_tick: Tick,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryGoals {
    #[serde(default)]
    pub primary: Option<PrimaryStoryGoal>,
    #[serde(default)]
    pub promotion_candidates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensionHistoryEntry {
    pub tick: Tick,
    pub level: u8,
    pub category: TensionCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    pub novel_name: String,
    /// 8-char UUID suffix.
    pub project_id: String,
    pub current_tick: Tick,
    #[serde(default)]
    pub active_character: Option<CharacterId>,
    #[serde(default)]
    pub story_foundation: Option<StoryFoundation>,
    #[serde(default)]
    pub story_goals: StoryGoals,
    #[serde(default)]
    pub tension_history: Vec<TensionHistoryEntry>,
}

impl ProjectState {
    pub fn new(novel_name: impl Into<String>, project_id: impl Into<String>) -> Self {
        ProjectState {
            novel_name: novel_name.into(),
            project_id: project_id.into(),
            current_tick: Tick::zero(),
            active_character: None,
            story_foundation: None,
            story_goals: StoryGoals::default(),
            tension_history: Vec::new(),
        }
    }

    /// Last `n` tension history entries, most recent last.
    pub fn recent_tension(&self, n: usize) -> &[TensionHistoryEntry] {
        let start = self.tension_history.len().saturating_sub(n);
        &self.tension_history[start..]
    }
}
