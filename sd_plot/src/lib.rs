//! Plot Outline Manager (§4.9): LLM-driven beat generation, authoring-time
//! validation, and the store-backed beat lifecycle the orchestrator drives
//! each tick when `generation.use_plot_first` is on.

pub mod errors;
pub mod generator;
pub mod outline;

pub use errors::{BeatGenerationError, BeatValidationError};
pub use generator::BeatGenerator;
pub use outline::OutlineManager;
