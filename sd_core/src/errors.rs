//! Shared error types for entity persistence.
//!
//! Mirrors the taxonomy in §4.1/§7: `NotFound`, `ConflictingId`, `IOFailure`.
//! Higher-level crates (tools, planner, orchestrator) define their own
//! `thiserror` enums and wrap this one with `#[from]`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} id {id} already allocated")]
    ConflictingId { kind: &'static str, id: String },

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("project directory is locked by another process: {0}")]
    ProjectLocked(String),

    #[error("{0}")]
    Invalid(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Non-fatal diagnostics raised alongside a successful operation: POV
/// mismatches, orphan references, oversized plans. Never a reason to abort
/// a tick, so this is never a variant of `StoreError` or any other `Error`
/// enum in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConsistencyWarning {
    PovMismatch { character_id: String, context_name: String },
    OrphanRelationshipReference { character_id: String },
    OversizedPlan { action_count: usize, soft_limit: usize },
    ContinuityFlag(String),
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyWarning::PovMismatch { character_id, context_name } => {
                write!(f, "pov mismatch: {character_id} vs context name '{context_name}'")
            }
            ConsistencyWarning::OrphanRelationshipReference { character_id } => {
                write!(f, "orphan relationship reference to {character_id}")
            }
            ConsistencyWarning::OversizedPlan { action_count, soft_limit } => {
                write!(f, "plan has {action_count} actions, exceeding soft limit {soft_limit}")
            }
            ConsistencyWarning::ContinuityFlag(msg) => write!(f, "continuity flag: {msg}"),
        }
    }
}
