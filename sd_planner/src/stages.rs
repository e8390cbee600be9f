//! Multi-Stage Planner (§4.5): Strategic → Semantic Gather → Tactical, plus
//! the single-stage fallback used when `use_multi_stage_planner` is off.

use std::time::Duration;

use sd_core::errors::StoreResult;
use sd_core::model::ProjectState;
use sd_core::{estimate_tokens, truncate_to_budget};
use sd_llm::LlmClient;
use sd_memory::index::SemanticIndex;
use sd_memory::queries::top_k_relevant_open_loops;
use sd_store::EntityStore;
use thiserror::Error;

use crate::context::{build_planner_context, PlannerContext};
use crate::plan::{Plan, PlanError};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Store(#[from] sd_core::errors::StoreError),
    #[error("llm call failed during {stage}: {source}")]
    Llm { stage: &'static str, source: sd_llm::LlmError },
    #[error("stage {stage} produced no usable output: {reason}")]
    Stage { stage: &'static str, reason: String },
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Token and fan-out limits for the three stages (§4.5's budgets).
#[derive(Debug, Clone)]
pub struct PlannerLimits {
    pub top_k_scenes: usize,
    pub top_k_open_loops: usize,
    pub top_k_lore: usize,
    pub strategic_max_in_tokens: usize,
    pub strategic_max_out: u32,
    pub tactical_max_in_tokens: usize,
    pub tactical_max_out: u32,
    pub soft_action_limit: usize,
}

impl Default for PlannerLimits {
    fn default() -> Self {
        PlannerLimits {
            top_k_scenes: 5,
            top_k_open_loops: 5,
            top_k_lore: 3,
            strategic_max_in_tokens: 500,
            strategic_max_out: 120,
            tactical_max_in_tokens: 1500,
            tactical_max_out: 800,
            soft_action_limit: 4,
        }
    }
}

/// Inputs gathered during Stage 2, with no LLM call involved.
#[derive(Debug, Clone, Default)]
struct GatherResult {
    scene_hits: Vec<String>,
    lore_hits: Vec<String>,
    open_loop_hits: Vec<String>,
}

pub struct MultiStagePlanner<'a> {
    llm: &'a dyn LlmClient,
    store: &'a EntityStore,
    index: SemanticIndex<'a>,
    tool_descriptions: Vec<String>,
    limits: PlannerLimits,
    timeout: Duration,
    use_multi_stage: bool,
}

impl<'a> MultiStagePlanner<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        store: &'a EntityStore,
        index: &'a dyn sd_llm::VectorIndex,
        tool_descriptions: Vec<String>,
        limits: PlannerLimits,
        timeout: Duration,
        use_multi_stage: bool,
    ) -> Self {
        MultiStagePlanner { llm, store, index: SemanticIndex::new(index), tool_descriptions, limits, timeout, use_multi_stage }
    }

    pub fn plan(
        &self,
        state: &ProjectState,
        recent_scenes_count: usize,
        beat_target: Option<&str>,
        qa_feedback: Option<&str>,
    ) -> Result<Plan, PlannerError> {
        if self.use_multi_stage {
            self.plan_multi_stage(state, recent_scenes_count, beat_target, qa_feedback)
        } else {
            self.plan_single_stage(state, recent_scenes_count, beat_target, qa_feedback)
        }
    }

    fn plan_single_stage(
        &self,
        state: &ProjectState,
        recent_scenes_count: usize,
        beat_target: Option<&str>,
        qa_feedback: Option<&str>,
    ) -> Result<Plan, PlannerError> {
        let mut ctx = build_planner_context(self.store, state, recent_scenes_count, beat_target, qa_feedback, &self.tool_descriptions)?;
        ctx.enforce_budget(self.limits.tactical_max_in_tokens);
        let prompt = render_tactical_prompt(&ctx, None);
        let raw = self
            .llm
            .generate(&prompt, self.limits.tactical_max_out, self.timeout)
            .map_err(|source| PlannerError::Llm { stage: "single_stage", source })?;
        Plan::from_llm_output(&raw).map_err(Into::into)
    }

    fn plan_multi_stage(
        &self,
        state: &ProjectState,
        recent_scenes_count: usize,
        beat_target: Option<&str>,
        qa_feedback: Option<&str>,
    ) -> Result<Plan, PlannerError> {
        let scene_intention = self.run_strategic(state)?;
        let gathered = self.run_gather(state, &scene_intention)?;

        let mut ctx = build_planner_context(self.store, state, recent_scenes_count, beat_target, qa_feedback, &self.tool_descriptions)?;
        ctx.gathered_scenes = gathered.scene_hits;
        ctx.gathered_lore = gathered.lore_hits;
        ctx.gathered_open_loops = gathered.open_loop_hits;
        ctx.enforce_budget(self.limits.tactical_max_in_tokens);

        let prompt = render_tactical_prompt(&ctx, Some(&scene_intention));
        let raw = self
            .llm
            .generate(&prompt, self.limits.tactical_max_out, self.timeout)
            .map_err(|source| PlannerError::Llm { stage: "tactical", source })?;
        Plan::from_llm_output(&raw).map_err(Into::into)
    }

    /// Stage 1: one-sentence `scene_intention` from a short strategic
    /// prompt.
    fn run_strategic(&self, state: &ProjectState) -> Result<String, PlannerError> {
        let prompt = render_strategic_prompt(state, self.limits.strategic_max_in_tokens);
        let raw = self
            .llm
            .generate(&prompt, self.limits.strategic_max_out, self.timeout)
            .map_err(|source| PlannerError::Llm { stage: "strategic", source })?;
        let intention = first_sentence(raw.trim());
        if intention.is_empty() {
            return Err(PlannerError::Stage { stage: "strategic", reason: "empty scene_intention".to_string() });
        }
        Ok(intention)
    }

    /// Stage 2: no LLM call. Keyword-overlap search for open loops
    /// (already built for §4.4's context builder), vector search for
    /// scenes and lore falling back to recency.
    fn run_gather(&self, state: &ProjectState, scene_intention: &str) -> StoreResult<GatherResult> {
        let scenes = self.store.list_scenes()?;
        let mut recency_scenes: Vec<String> = scenes.iter().map(|s| s.id.to_string()).collect();
        recency_scenes.reverse();
        let scene_hits: Vec<String> = self
            .index
            .search_or_recency("scenes", scene_intention, self.limits.top_k_scenes, &recency_scenes)
            .into_iter()
            .map(|hit| hit.id)
            .collect();

        let lore = self.store.list_lore()?;
        let recency_lore: Vec<String> = lore.iter().rev().map(|l| l.id.to_string()).collect();
        let lore_hits: Vec<String> = self
            .index
            .search_or_recency("lore", scene_intention, self.limits.top_k_lore, &recency_lore)
            .into_iter()
            .map(|hit| hit.id)
            .collect();

        // Open-loop relevance is pure keyword overlap, no vector index
        // involved (§4.5 "no LLM").
        let open_loops = self.store.load_open_loops()?;
        let open_loop_hits: Vec<String> = top_k_relevant_open_loops(&open_loops, scene_intention, self.limits.top_k_open_loops)
            .iter()
            .map(|l| format!("{}: {}", l.id, l.description))
            .collect();

        // Protagonist relationships are already folded unconditionally
        // into the planner context by `build_planner_context`.
        let _ = state;
        Ok(GatherResult { scene_hits, lore_hits, open_loop_hits })
    }
}

fn first_sentence(text: &str) -> String {
    let end = text.find(['.', '!', '?']).map(|i| i + 1).unwrap_or(text.len());
    text[..end].trim().to_string()
}

fn render_strategic_prompt(state: &ProjectState, budget: usize) -> String {
    let foundation = state
        .story_foundation
        .as_ref()
        .map(|f| format!("Genre: {}. Premise: {}. Tone: {}.", f.genre, f.premise, f.tone))
        .unwrap_or_default();
    let goal = state
        .story_goals
        .primary
        .as_ref()
        .map(|g| format!("Primary goal: {}", g.description))
        .unwrap_or_else(|| "No primary goal promoted yet.".to_string());
    let tension: Vec<String> = state.recent_tension(5).iter().map(|t| format!("{}:{:?}", t.level, t.category)).collect();

    let prompt = format!(
        "Tick {}. {}\n{}\nRecent tension pattern: {}\nIn one sentence, state the story intention for the next scene.",
        state.current_tick.0,
        foundation,
        goal,
        tension.join(", ")
    );
    truncate_to_budget(&prompt, budget)
}

fn render_tactical_prompt(ctx: &PlannerContext, scene_intention: Option<&str>) -> String {
    let mut sections = Vec::new();
    if let Some(intention) = scene_intention {
        sections.push(format!("Scene intention: {intention}"));
    }
    sections.push(format!("Novel: {} (tick {})", ctx.novel_name, ctx.current_tick));
    if !ctx.active_character_summary.is_empty() {
        sections.push(format!("Active character: {}", ctx.active_character_summary));
    }
    if !ctx.overall_summary.is_empty() {
        sections.push(format!("Story so far:\n- {}", ctx.overall_summary.join("\n- ")));
    }
    if !ctx.recent_scene_summaries.is_empty() {
        sections.push(format!("Recent scenes:\n{}", ctx.recent_scene_summaries.join("\n")));
    }
    if !ctx.prioritized_open_loops.is_empty() {
        sections.push(format!("Open loops:\n{}", ctx.prioritized_open_loops.join("\n")));
    }
    if !ctx.gathered_scenes.is_empty() {
        sections.push(format!("Relevant past scenes: {}", ctx.gathered_scenes.join(", ")));
    }
    if !ctx.gathered_lore.is_empty() {
        sections.push(format!("Relevant lore: {}", ctx.gathered_lore.join(", ")));
    }
    if !ctx.gathered_open_loops.is_empty() {
        sections.push(format!("Query-relevant open loops:\n{}", ctx.gathered_open_loops.join("\n")));
    }
    if !ctx.protagonist_relationships.is_empty() {
        sections.push(format!("Relationships:\n{}", ctx.protagonist_relationships.join("\n")));
    }
    if !ctx.faction_summaries.is_empty() {
        sections.push(format!("Factions:\n{}", ctx.faction_summaries.join("\n")));
    }
    if let Some(beat) = &ctx.beat_target {
        sections.push(format!("Beat target: {beat}"));
    }
    if let Some(qa) = &ctx.qa_feedback {
        sections.push(format!("Previous QA feedback: {qa}"));
    }
    sections.push(format!("Available tools:\n{}", ctx.available_tools.join("\n")));
    sections.push(
        "Respond with a single JSON object matching the plan schema: rationale, scene_intention, key_change, actions[], \
expected_outcomes[], and any applicable optional fields."
            .to_string(),
    );
    let prompt = sections.join("\n\n");
    debug_assert!(estimate_tokens(&prompt) > 0 || prompt.is_empty());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_llm::{InMemoryVectorIndex, MockLlmClient};
    use tempfile::tempdir;

    fn sample_state() -> ProjectState {
        ProjectState::new("Ashwake", "a1b2c3d4")
    }

    fn valid_plan_json(scene_intention: &str) -> String {
        serde_json::json!({
            "rationale": "Elena needs answers.",
            "scene_intention": scene_intention,
            "key_change": "Elena learns who forged the ledger.",
            "actions": [],
            "expected_outcomes": ["Elena suspects Marcus"],
        })
        .to_string()
    }

    #[test]
    fn single_stage_fallback_calls_llm_once() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let llm = MockLlmClient::new(vec![valid_plan_json("Elena investigates the ledger.")]);
        let planner = MultiStagePlanner::new(
            &llm,
            &store,
            &backend,
            vec!["memory.search - search indexed entities".to_string()],
            PlannerLimits::default(),
            Duration::from_millis(100),
            false,
        );
        let plan = planner.plan(&sample_state(), 3, None, None).unwrap();
        assert_eq!(plan.scene_intention, "Elena investigates the ledger.");
    }

    #[test]
    fn multi_stage_runs_strategic_then_tactical() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let llm = MockLlmClient::new(vec!["Elena confronts Marcus.".to_string(), valid_plan_json("Elena confronts Marcus.")]);
        let planner = MultiStagePlanner::new(
            &llm,
            &store,
            &backend,
            vec!["memory.search - search indexed entities".to_string()],
            PlannerLimits::default(),
            Duration::from_millis(100),
            true,
        );
        let plan = planner.plan(&sample_state(), 3, None, None).unwrap();
        assert_eq!(plan.scene_intention, "Elena confronts Marcus.");
    }

    #[test]
    fn empty_strategic_output_is_a_stage_error() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let backend = InMemoryVectorIndex::new();
        let llm = MockLlmClient::new(vec!["   ".to_string()]);
        let planner = MultiStagePlanner::new(
            &llm,
            &store,
            &backend,
            vec![],
            PlannerLimits::default(),
            Duration::from_millis(100),
            true,
        );
        let err = planner.plan(&sample_state(), 3, None, None).unwrap_err();
        assert!(matches!(err, PlannerError::Stage { stage: "strategic", .. }));
    }

    #[test]
    fn first_sentence_stops_at_terminal_punctuation() {
        assert_eq!(first_sentence("Elena investigates. She finds nothing."), "Elena investigates.");
        assert_eq!(first_sentence("no terminal punctuation here"), "no terminal punctuation here");
    }
}
