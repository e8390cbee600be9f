use crate::ids::LocationId;
use serde::{Deserialize, Serialize};

use super::HistoryEntry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensoryDetails {
    #[serde(default)]
    pub visual: String,
    #[serde(default)]
    pub auditory: String,
    #[serde(default)]
    pub olfactory: String,
    #[serde(default)]
    pub tactile: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    /// Clamped to `0..=10` on every write (see `LocationState::set_tension`).
    pub tension_level: u8,
    #[serde(default)]
    pub time_of_day: String,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub occupants: Vec<String>,
    #[serde(default)]
    pub notable_objects: Vec<String>,
}

impl LocationState {
    pub fn set_tension(&mut self, level: u8) {
        self.tension_level = level.min(10);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub atmosphere: String,
    #[serde(default)]
    pub sensory_details: SensoryDetails,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub connections: Vec<LocationId>,
    #[serde(default)]
    pub current_state: LocationState,
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tension_level_clamps_to_ten() {
        let mut state = LocationState::default();
        state.set_tension(15);
        assert_eq!(state.tension_level, 10);
        state.set_tension(3);
        assert_eq!(state.tension_level, 3);
    }
}
