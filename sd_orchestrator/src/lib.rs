//! The Tick Orchestrator (§4.10): the top-level loop that drives every
//! other crate in the workspace through one tick of story generation.

pub mod checkpoint;
pub mod errors;
pub mod tick;

pub use checkpoint::{CheckpointError, Checkpointer, CheckpointSnapshot, CHECKPOINT_FORMAT_VERSION, CHECKPOINT_MAGIC};
pub use errors::TickError;
pub use tick::{Orchestrator, TickReport};
