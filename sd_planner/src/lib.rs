//! The Multi-Stage Planner (§4.5) and the Context Builders (§4.4) it and
//! the Scene Writer share.

pub mod context;
pub mod plan;
pub mod stages;

pub use context::{build_planner_context, build_writer_context, PlannerContext, WriterContext};
pub use plan::{BeatStrategy, BeatTarget, DialogueTargets, Plan, PlanError, PlanMetadata, SceneLength, SceneMode};
pub use stages::{MultiStagePlanner, PlannerError, PlannerLimits};
