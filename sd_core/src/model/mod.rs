//! Entity record types persisted under the project directory (§3 Data Model).

mod character;
mod faction;
mod location;
mod lore;
mod open_loop;
mod plot;
mod project_state;
mod relationship;
mod scene;

pub use character::*;
pub use faction::*;
pub use location::*;
pub use lore::*;
pub use open_loop::*;
pub use plot::*;
pub use project_state::*;
pub use relationship::*;
pub use scene::*;

/// Tension category banding shared by Scene, Evaluator and ProjectState
/// (§4.7). 0–3 `Calm`, 4–6 `Rising`, 7–8 `High`, 9–10 `Climactic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensionCategory {
    Calm,
    Rising,
    High,
    Climactic,
}

/// Map a tension level in `0..=10` to its category. Returns `None` for any
/// input outside that range (§8 invariant #9); banding is a total function
/// only on the valid domain, by design.
pub fn tension_category_for(level: u8) -> Option<TensionCategory> {
    match level {
        0..=3 => Some(TensionCategory::Calm),
        4..=6 => Some(TensionCategory::Rising),
        7..=8 => Some(TensionCategory::High),
        9..=10 => Some(TensionCategory::Climactic),
        _ => None,
    }
}
