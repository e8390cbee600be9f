//! Tool Executor (§4.3): iterates plan actions in order, halting on the
//! first tool error. Grounded on `syn_director`'s staged-pipeline idiom of
//! tracking progress through named, inspectable stages — here the "stage"
//! is simply the executed-so-far prefix of the action list, which the
//! orchestrator persists verbatim into the error record on a halt (§7).

use crate::errors::ToolError;
use crate::registry::{ToolContext, ToolRegistry};
use serde::{Deserialize, Serialize};

/// One planned tool invocation, taken verbatim from `Plan::actions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// A single action's outcome, recorded whether it succeeded or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_index: usize,
    pub tool: String,
    pub args: serde_json::Value,
    pub result: serde_json::Value,
    pub success: bool,
}

/// Everything the Executor produced for one tick: the successful results
/// accumulated so far, and — on a halt — the error that stopped it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionReport {
    pub results: Vec<ActionResult>,
    pub failed_action_index: Option<usize>,
    pub error_message: Option<String>,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.failed_action_index.is_none()
    }
}

pub struct Executor<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> Executor<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Executor { registry }
    }

    /// Run `actions` in order against `ctx`. Failure policy: halt-on-first-
    /// error (§4.3). Successful results before the failure are still
    /// returned, so the orchestrator can persist the partial execution.
    pub fn execute(&self, ctx: &ToolContext<'_>, actions: &[Action]) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for (index, action) in actions.iter().enumerate() {
            let outcome = self.run_one(ctx, action);
            match outcome {
                Ok(value) => {
                    report.results.push(ActionResult {
                        action_index: index,
                        tool: action.tool.clone(),
                        args: action.args.clone(),
                        result: value,
                        success: true,
                    });
                }
                Err(err) => {
                    tracing::warn!(action_index = index, tool = %action.tool, %err, "tool execution halted");
                    report.failed_action_index = Some(index);
                    report.error_message = Some(err.to_string());
                    break;
                }
            }
        }

        report
    }

    fn run_one(&self, ctx: &ToolContext<'_>, action: &Action) -> Result<serde_json::Value, ToolError> {
        let tool = self.registry.get(&action.tool).ok_or_else(|| ToolError::UnknownTool(action.tool.clone()))?;
        tool.execute(ctx, &action.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_llm::InMemoryVectorIndex;
    use sd_store::EntityStore;
    use tempfile::tempdir;

    #[test]
    fn execute_halts_on_first_error_and_keeps_prior_successes() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };
        let registry = ToolRegistry::with_defaults();
        let executor = Executor::new(&registry);

        let actions = vec![
            Action { tool: "character.generate".to_string(), args: serde_json::json!({ "name": "Dax Ferrow", "role": "ally" }) },
            Action {
                tool: "relationship.create".to_string(),
                args: serde_json::json!({ "character_a": "C0", "character_b": "C999", "relationship_type": "allies" }),
            },
            Action { tool: "character.generate".to_string(), args: serde_json::json!({ "name": "Never Reached", "role": "x" }) },
        ];

        let report = executor.execute(&ctx, &actions);
        assert!(!report.success());
        assert_eq!(report.failed_action_index, Some(1));
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].success);
    }

    #[test]
    fn execute_reports_unknown_tool() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };
        let registry = ToolRegistry::with_defaults();
        let executor = Executor::new(&registry);

        let actions = vec![Action { tool: "teleport.player".to_string(), args: serde_json::json!({}) }];
        let report = executor.execute(&ctx, &actions);
        assert_eq!(report.failed_action_index, Some(0));
        assert!(report.error_message.unwrap().contains("unknown tool"));
    }

    #[test]
    fn execute_all_succeed_has_no_failure() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let ctx = ToolContext { store: &store, index: &backend };
        let registry = ToolRegistry::with_defaults();
        let executor = Executor::new(&registry);

        let actions = vec![
            Action { tool: "character.generate".to_string(), args: serde_json::json!({ "name": "Elena Thorne", "role": "protagonist" }) },
            Action { tool: "location.generate".to_string(), args: serde_json::json!({ "name": "The Archive" }) },
        ];
        let report = executor.execute(&ctx, &actions);
        assert!(report.success());
        assert_eq!(report.results.len(), 2);
    }
}
