//! Tool Registry & Executor (§4.3): a closed, named set of tools the
//! planner's `actions[]` invoke, executed halt-on-first-error.

pub mod args;
pub mod errors;
pub mod executor;
pub mod registry;
pub mod tools;

pub use errors::{ToolError, ToolResult};
pub use executor::{Action, ActionResult, ExecutionReport, Executor};
pub use registry::{Tool, ToolContext, ToolRegistry};
