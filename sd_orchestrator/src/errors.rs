//! Tick-level error taxonomy (§7's Rust realization), wrapping every
//! subsystem error the tick state machine can surface. `ConsistencyWarning`
//! deliberately has no variant here — it is plain data accumulated
//! alongside a successful result, never a reason to abort a tick.

use sd_core::errors::StoreError;
use sd_llm::LlmError;
use sd_plot::BeatGenerationError;
use sd_planner::PlannerError;
use sd_tools::ToolError;
use sd_writer::{EvaluationError, WriterError};

#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Writer(#[from] WriterError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    BeatGeneration(#[from] BeatGenerationError),

    #[error(transparent)]
    Checkpoint(#[from] crate::checkpoint::CheckpointError),

    #[error("tool execution halted at action {index}: {message}")]
    ToolExecutionHalted { index: usize, message: String },

    #[error("plan is invalid for this tick: {0}")]
    PlanInvalid(String),

    #[error("llm call failed: {0}")]
    Llm(#[from] LlmError),
}

impl TickError {
    /// A short machine-readable label for the persisted error record
    /// (§4.10.3), grouping variants by the spec's named failure modes
    /// rather than by Rust enum shape.
    pub fn kind(&self) -> &'static str {
        match self {
            TickError::Planner(PlannerError::Plan(sd_planner::PlanError::Parse(_))) => "plan_parse_error",
            TickError::Planner(PlannerError::Plan(sd_planner::PlanError::Schema(_))) => "plan_schema_error",
            TickError::Planner(_) => "plan_parse_error",
            TickError::Tool(_) | TickError::ToolExecutionHalted { .. } => "tool_execution_error",
            TickError::Writer(_) => "scene_write_error",
            TickError::Evaluation(_) => "scene_evaluation_failed",
            TickError::BeatGeneration(_) => "beat_generation_error",
            TickError::Checkpoint(_) => "checkpoint_error",
            TickError::Store(_) => "store_error",
            TickError::PlanInvalid(_) => "plan_invalid",
            TickError::Llm(_) => "llm_error",
        }
    }
}
