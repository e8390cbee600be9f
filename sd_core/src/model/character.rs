use crate::ids::{CharacterId, SceneId};
use crate::time::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    #[serde(default)]
    pub core_traits: Vec<String>,
    #[serde(default)]
    pub fears: Vec<String>,
    #[serde(default)]
    pub desires: Vec<String>,
    #[serde(default)]
    pub flaws: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub emotional_state: String,
    #[serde(default)]
    pub physical_state: String,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub beliefs: Vec<String>,
}

/// One entry in a character's (or location's) mutation history, appended by
/// the Entity Updater on every `update` call (§4.1, §4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tick: Tick,
    pub scene_id: SceneId,
    pub changes: serde_json::Value,
    pub summary: String,
    /// Stable hash of `(tick, scene_id, changes)` used to suppress
    /// duplicate history entries when the same facts are applied twice
    /// (§8 round-trip/idempotence laws).
    pub diff_hash: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub first_name: String,
    pub family_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub nicknames: Vec<String>,
    pub role: String,
    pub description: String,
    #[serde(default)]
    pub physical_traits: String,
    #[serde(default)]
    pub personality: Personality,
    #[serde(default)]
    pub current_state: CharacterState,
    #[serde(default)]
    pub immediate_goals: Vec<String>,
    #[serde(default)]
    pub arc_goal: Option<String>,
    #[serde(default)]
    pub story_goal: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl Character {
    /// The name the writer is instructed to use in prose (§4.6).
    pub fn display_name(&self) -> &str {
        &self.first_name
    }

    /// Title (if any) + first name + family name.
    pub fn full_name(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => {
                format!("{title} {} {}", self.first_name, self.family_name)
            }
            _ => format!("{} {}", self.first_name, self.family_name),
        }
    }

    /// POV identity check (invariant #7): true if `context_name` matches
    /// neither `display_name()` nor `full_name()`.
    pub fn name_mismatches(&self, context_name: &str) -> bool {
        let context_name = context_name.trim();
        if context_name.is_empty() {
            return false;
        }
        context_name != self.display_name() && context_name != self.full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(first: &str, family: &str) -> Character {
        Character {
            id: CharacterId(0),
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
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn display_name_is_first_name() {
        let c = sample("Elena", "Thorne");
        assert_eq!(c.display_name(), "Elena");
    }

    #[test]
    fn full_name_includes_title_when_present() {
        let mut c = sample("Elena", "Thorne");
        c.title = Some("Dr.".to_string());
        assert_eq!(c.full_name(), "Dr. Elena Thorne");
    }

    #[test]
    fn name_mismatch_detects_pov_switch() {
        let c = sample("Elena", "Thorne");
        assert!(c.name_mismatches("Marcus Vale"));
        assert!(!c.name_mismatches("Elena"));
        assert!(!c.name_mismatches("Elena Thorne"));
    }

    #[test]
    fn empty_context_name_never_mismatches() {
        let c = sample("Elena", "Thorne");
        assert!(!c.name_mismatches(""));
        assert!(!c.name_mismatches("   "));
    }
}
