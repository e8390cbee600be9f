//! Plan schema (§4.5 "Plan schema", §6 "Plan JSON"), JSON extraction
//! tolerant of fenced code, and the soft/hard validation rules.

use sd_core::errors::ConsistencyWarning;
use sd_tools::Action;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    Dialogue,
    Political,
    Action,
    Technical,
    Introspective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatStrategy {
    Direct,
    Setup,
    Followup,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneLength {
    Brief,
    Short,
    Long,
    Extended,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueTargets {
    #[serde(default)]
    pub min_exchanges: Option<u32>,
    #[serde(default)]
    pub conflict_axis: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatTarget {
    #[serde(default)]
    pub beat_id: Option<String>,
    #[serde(default = "default_beat_strategy")]
    pub strategy: BeatStrategy,
    #[serde(default)]
    pub notes: String,
}

fn default_beat_strategy() -> BeatStrategy {
    BeatStrategy::Skip
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanMetadata {
    #[serde(default)]
    pub scene_length: Option<SceneLength>,
}

/// The tactical plan a tick's Stage 3 (or the single-stage fallback)
/// produces (§4.5 "Plan schema"). Required fields have no `Default` or
/// `#[serde(default)]`: a missing one fails to deserialize, which
/// `Plan::from_llm_output` turns into `PlanError::Schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub rationale: String,
    pub scene_intention: String,
    pub key_change: String,
    pub actions: Vec<Action>,
    pub expected_outcomes: Vec<String>,

    #[serde(default)]
    pub progress_milestone: Option<String>,
    #[serde(default)]
    pub progress_step: Option<String>,
    #[serde(default)]
    pub pov_character: Option<String>,
    /// The name the plan intends the POV character to go by in this scene.
    /// Normally absent (the writer context falls back to the resolved
    /// character's stored `display_name`), but set when the tactical stage
    /// is steering the scene toward a character identity that may not
    /// match the stored record yet (§4.8 POV-switch detection, §8
    /// invariant #8).
    #[serde(default)]
    pub pov_character_name: Option<String>,
    #[serde(default)]
    pub target_location: Option<String>,
    #[serde(default)]
    pub loops_addressed: Vec<String>,
    #[serde(default)]
    pub scene_mode: Option<SceneMode>,
    #[serde(default)]
    pub palette_shift: Vec<String>,
    #[serde(default)]
    pub transition_path: Option<String>,
    #[serde(default)]
    pub dialogue_targets: Option<DialogueTargets>,
    #[serde(default)]
    pub beat_target: Option<BeatTarget>,
    #[serde(default)]
    pub metadata: PlanMetadata,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("could not parse plan JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("plan is missing required fields: {0}")]
    Schema(String),
}

/// Strip a ```json fenced code block (or a bare ``` fence) around `raw`,
/// tolerating leading/trailing prose the LLM may have added (§4.5 "JSON
/// extraction tolerates fenced-code wrappers").
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    // No fence: the first `{` to the last `}` is the object, trimming any
    // prose the model wrapped around it.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return &trimmed[start..=end];
        }
    }
    trimmed
}

impl Plan {
    /// Parse the LLM's raw Stage 3 output into a validated `Plan`.
    /// Required-field absence surfaces as `PlanError::Schema` rather than
    /// the raw serde error, matching §4.5's "schema check rejects missing
    /// required fields".
    pub fn from_llm_output(raw: &str) -> Result<Self, PlanError> {
        let candidate = strip_code_fence(raw);
        let value: serde_json::Value = serde_json::from_str(candidate)?;
        let missing = required_fields_missing(&value);
        if !missing.is_empty() {
            return Err(PlanError::Schema(missing.join(", ")));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Soft validation rules (§4.5): warnings, never a reason to reject
    /// the plan.
    pub fn soft_warnings(&self, previous_scene_mode: Option<SceneMode>, soft_action_limit: usize) -> Vec<ConsistencyWarning> {
        let mut warnings = Vec::new();
        if self.actions.len() > soft_action_limit {
            warnings.push(ConsistencyWarning::OversizedPlan { action_count: self.actions.len(), soft_limit: soft_action_limit });
        }
        if self.loops_addressed.is_empty() {
            warnings.push(ConsistencyWarning::ContinuityFlag("plan addresses no open loops".to_string()));
        }
        if let (Some(mode), Some(prev)) = (self.scene_mode, previous_scene_mode) {
            if mode == prev {
                warnings.push(ConsistencyWarning::ContinuityFlag(format!("scene_mode repeats previous scene ({mode:?})")));
            }
        }
        warnings
    }
}

fn required_fields_missing(value: &serde_json::Value) -> Vec<&'static str> {
    const REQUIRED: &[&str] = &["rationale", "scene_intention", "key_change", "actions", "expected_outcomes"];
    REQUIRED.iter().filter(|field| value.get(**field).is_none()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_plan_json() -> String {
        serde_json::json!({
            "rationale": "Elena needs to confront the ledger's origin.",
            "scene_intention": "Elena investigates the hidden ledger.",
            "key_change": "Elena learns who forged the ledger.",
            "actions": [],
            "expected_outcomes": ["Elena suspects Marcus"],
        })
        .to_string()
    }

    #[test]
    fn parses_bare_json() {
        let plan = Plan::from_llm_output(&valid_plan_json()).unwrap();
        assert_eq!(plan.key_change, "Elena learns who forged the ledger.");
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("Here is the plan:\n```json\n{}\n```", valid_plan_json());
        let plan = Plan::from_llm_output(&fenced).unwrap();
        assert_eq!(plan.scene_intention, "Elena investigates the hidden ledger.");
    }

    #[test]
    fn parses_bare_fence_without_json_marker() {
        let fenced = format!("```\n{}\n```", valid_plan_json());
        assert!(Plan::from_llm_output(&fenced).is_ok());
    }

    #[test]
    fn missing_required_field_is_schema_error() {
        let mut value: serde_json::Value = serde_json::from_str(&valid_plan_json()).unwrap();
        value.as_object_mut().unwrap().remove("key_change");
        let err = Plan::from_llm_output(&value.to_string()).unwrap_err();
        match err {
            PlanError::Schema(msg) => assert!(msg.contains("key_change")),
            _ => panic!("expected schema error"),
        }
    }

    #[test]
    fn garbage_input_is_parse_error() {
        let err = Plan::from_llm_output("not json at all").unwrap_err();
        assert!(matches!(err, PlanError::Parse(_)));
    }

    #[test]
    fn warns_on_oversized_action_list() {
        let mut plan: Plan = serde_json::from_str(&valid_plan_json()).unwrap();
        plan.actions = vec![
            sd_tools::Action { tool: "a".into(), args: serde_json::json!({}) },
            sd_tools::Action { tool: "b".into(), args: serde_json::json!({}) },
            sd_tools::Action { tool: "c".into(), args: serde_json::json!({}) },
            sd_tools::Action { tool: "d".into(), args: serde_json::json!({}) },
            sd_tools::Action { tool: "e".into(), args: serde_json::json!({}) },
        ];
        plan.loops_addressed = vec!["OL0".to_string()];
        let warnings = plan.soft_warnings(None, 4);
        assert!(warnings.iter().any(|w| matches!(w, ConsistencyWarning::OversizedPlan { .. })));
    }

    #[test]
    fn warns_when_scene_mode_repeats() {
        let mut plan: Plan = serde_json::from_str(&valid_plan_json()).unwrap();
        plan.scene_mode = Some(SceneMode::Dialogue);
        plan.loops_addressed = vec!["OL0".to_string()];
        let warnings = plan.soft_warnings(Some(SceneMode::Dialogue), 4);
        assert!(warnings.iter().any(|w| matches!(w, ConsistencyWarning::ContinuityFlag(_))));
    }
}
