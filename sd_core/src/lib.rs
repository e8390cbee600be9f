//! Shared primitives for StoryDaemon: entity ids, the persisted data model,
//! configuration, error taxonomy, and the atomic-write helper every other
//! crate in the workspace builds on.

pub mod atomic_io;
pub mod config;
pub mod errors;
pub mod ids;
pub mod model;
pub mod time;
pub mod tokens;

pub use config::OrchestratorConfig;
pub use errors::{ConsistencyWarning, StoreError, StoreResult};
pub use ids::{CharacterId, Counters, EntityKind, FactionId, LocationId, LoreId, OpenLoopId, PlotBeatId, RelationshipId, SceneId};
pub use time::Tick;
pub use tokens::{estimate_tokens, truncate_to_budget};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
