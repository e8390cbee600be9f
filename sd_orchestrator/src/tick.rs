//! The Tick Orchestrator (§4.10): drives one tick of the thirteen-state
//! flow (or the two-phase first-tick bootstrap) across every subsystem.
//!
//! Grounded on `syn_director::pipeline`'s per-turn state machine, adapted
//! from the reference's single monolithic stage list to the spec's
//! load/plan/execute/write/commit/extract/verify/checkpoint/advance split.

use sd_core::config::OrchestratorConfig;
use sd_core::errors::ConsistencyWarning;
use sd_core::ids::{CharacterId, EntityKind, LocationId};
use sd_core::model::{PlotOutline, ProjectState, Scene};
use sd_core::time::{now_iso8601, Tick};
use sd_llm::{LlmClient, VectorIndex};
use sd_planner::{MultiStagePlanner, Plan, PlannerLimits};
use sd_plot::{BeatGenerator, OutlineManager};
use sd_store::{EntityStore, ProjectLock};
use sd_tools::{Action, ActionResult, ExecutionReport, Executor, ToolContext, ToolRegistry};
use sd_writer::{check_pov, check_word_count, score_tension, QaEvaluator, QaRecord, SceneWriter, TensionInputs};
use sd_extract::{ExtractedFacts, Extractor, Updater};

use crate::checkpoint::Checkpointer;
use crate::errors::TickError;

/// The result of a single successful tick, returned to whatever drives
/// the orchestrator in a loop (the CLI, or a test harness).
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: Tick,
    pub scene_id: sd_core::ids::SceneId,
    pub word_count: usize,
    pub tension_level: Option<u8>,
    pub checkpoint_taken: bool,
    pub warnings: Vec<ConsistencyWarning>,
}

/// What a tick did before scene writing: which ids to write with, and the
/// tool-result summary the writer should see. First-tick bootstrap and
/// normal ticks both produce one of these before converging on
/// `finish_tick`.
struct PreparedTick {
    pov_character: CharacterId,
    location: LocationId,
    plan: Plan,
    execution: ExecutionReport,
    beat_target_description: Option<String>,
    beat_id: Option<sd_core::ids::PlotBeatId>,
    tool_result_summary: Vec<String>,
}

#[derive(serde::Serialize)]
struct PersistedPlan<'a> {
    tick: u64,
    plan: &'a Plan,
    execution: &'a ExecutionReport,
    warnings: &'a [ConsistencyWarning],
}

/// Owned mirror of `PersistedPlan`, for reading a prior tick's plan record
/// back off disk (§4.7's `qa_feedback`/previous-`scene_mode` inputs).
#[derive(serde::Deserialize)]
struct PersistedPlanOwned {
    #[allow(dead_code)]
    tick: u64,
    plan: Plan,
    #[allow(dead_code)]
    execution: ExecutionReport,
    #[allow(dead_code)]
    warnings: Vec<ConsistencyWarning>,
}

#[derive(serde::Serialize)]
struct PersistedError {
    tick: u64,
    kind: &'static str,
    message: String,
}

pub struct Orchestrator<'a> {
    store: EntityStore,
    config: OrchestratorConfig,
    llm: &'a dyn LlmClient,
    index: &'a dyn VectorIndex,
    registry: ToolRegistry,
}

impl<'a> Orchestrator<'a> {
    pub fn new(root: impl Into<std::path::PathBuf>, config: OrchestratorConfig, llm: &'a dyn LlmClient, index: &'a dyn VectorIndex) -> Self {
        Orchestrator { store: EntityStore::new(root), config, llm, index, registry: ToolRegistry::with_defaults() }
    }

    /// Run exactly one tick, holding the project lock for its duration
    /// (§5: no concurrent tick on the same project directory).
    pub fn run_tick(&self) -> Result<TickReport, TickError> {
        let _lock = ProjectLock::acquire(&self.store.paths.lock())?;
        let state = self.store.load_state()?;
        let tick = state.current_tick;

        let outcome = if tick.is_first() {
            self.run_first_tick(state)
        } else {
            self.run_normal_tick(state)
        };

        if let Err(err) = &outcome {
            self.persist_error(tick.0, err)?;
        }
        outcome
    }

    /// §4.10.2: Phase 1 allocates characters/locations the plan invented,
    /// rewriting `pov_character`/`target_location` to the new ids and
    /// seeding `active_character` before Phase 2 writes the scene.
    fn run_first_tick(&self, state: ProjectState) -> Result<TickReport, TickError> {
        let mut state = state;
        let tool_descriptions = tool_catalogue(&self.registry);
        let limits = PlannerLimits::default();
        let soft_action_limit = limits.soft_action_limit;
        let planner = MultiStagePlanner::new(
            self.llm,
            &self.store,
            self.index,
            tool_descriptions,
            limits,
            self.config.llm.timeout,
            self.config.generation.use_multi_stage_planner,
        );
        let mut plan = planner.plan(&state, self.config.generation.recent_scenes_count, None, None)?;

        let (generator_actions, scene_actions): (Vec<Action>, Vec<Action>) =
            plan.actions.iter().cloned().partition(|a| a.tool == "character.generate" || a.tool == "location.generate");

        let ctx = ToolContext { store: &self.store, index: self.index };
        let executor = Executor::new(&self.registry);
        let bootstrap_report = executor.execute(&ctx, &generator_actions);
        if !bootstrap_report.success() {
            return Err(TickError::ToolExecutionHalted {
                index: bootstrap_report.failed_action_index.unwrap_or(0),
                message: bootstrap_report.error_message.unwrap_or_default(),
            });
        }

        let mut first_character: Option<CharacterId> = None;
        for result in &bootstrap_report.results {
            match result.tool.as_str() {
                "character.generate" => {
                    if let Some(id) = result.result.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse::<CharacterId>().ok()) {
                        if first_character.is_none() {
                            first_character = Some(id);
                        }
                        plan.pov_character = Some(id.to_string());
                    }
                }
                "location.generate" => {
                    if let Some(id) = result.result.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse::<LocationId>().ok()) {
                        plan.target_location = Some(id.to_string());
                    }
                }
                _ => {}
            }
        }

        if state.active_character.is_none() {
            state.active_character = first_character;
        }

        let (pov_character, location) = resolve_pov_and_location(&plan, &state)?;

        let scene_report = executor.execute(&ctx, &scene_actions);
        if !scene_report.success() {
            self.persist_plan(state.current_tick.0, &plan, &scene_report, &[])?;
            return Err(TickError::ToolExecutionHalted {
                index: scene_report.failed_action_index.unwrap_or(0),
                message: scene_report.error_message.unwrap_or_default(),
            });
        }

        let warnings = plan.soft_warnings(None, soft_action_limit);
        self.persist_plan(state.current_tick.0, &plan, &scene_report, &warnings)?;

        let tool_result_summary = summarize_tool_results(&scene_report);

        let prepared = PreparedTick {
            pov_character,
            location,
            plan,
            execution: scene_report,
            beat_target_description: None,
            beat_id: None,
            tool_result_summary,
        };
        self.finish_tick(state, prepared, warnings)
    }

    /// §4.10.1 states 2-5: optional beat (re)generation and selection,
    /// a single planning pass, and single-phase tool execution.
    fn run_normal_tick(&self, state: ProjectState) -> Result<TickReport, TickError> {
        let mut outline = self.load_or_init_outline()?;
        let mut beat_target_description = None;
        let mut beat_id = None;

        if self.config.generation.use_plot_first {
            if outline.needs_regeneration(self.config.generation.plot_regeneration_threshold) {
                let summary = summarize_story_state(&state, &self.store)?;
                let generator = BeatGenerator::new(self.llm, self.config.llm.writer_max_tokens, self.config.llm.timeout);
                match generator.generate_next_beats(self.config.generation.plot_beats_ahead, &summary, &self.store) {
                    Ok(batch) => {
                        let manager = OutlineManager::new(&self.store);
                        match manager.add_beats(batch) {
                            Ok(updated) => outline = updated,
                            Err(errs) => {
                                tracing::warn!(?errs, "discarding invalid generated beats");
                            }
                        }
                    }
                    Err(err) => {
                        if !self.config.generation.fallback_to_reactive {
                            return Err(TickError::BeatGeneration(err));
                        }
                        tracing::warn!(%err, "beat generation failed, continuing reactively");
                    }
                }
            }

            if let Some(beat) = outline.get_next_beat().cloned() {
                let manager = OutlineManager::new(&self.store);
                manager.start_beat(beat.id)?;
                beat_target_description = Some(beat.description.clone());
                beat_id = Some(beat.id);
            }
        }

        let qa_feedback = self.load_previous_qa_feedback(&state)?;
        let tool_descriptions = tool_catalogue(&self.registry);
        let limits = PlannerLimits::default();
        let soft_action_limit = limits.soft_action_limit;
        let planner = MultiStagePlanner::new(
            self.llm,
            &self.store,
            self.index,
            tool_descriptions,
            limits,
            self.config.llm.timeout,
            self.config.generation.use_multi_stage_planner,
        );
        let plan = planner.plan(
            &state,
            self.config.generation.recent_scenes_count,
            beat_target_description.as_deref(),
            qa_feedback.as_deref(),
        )?;

        let (pov_character, location) = resolve_pov_and_location(&plan, &state)?;

        let ctx = ToolContext { store: &self.store, index: self.index };
        let executor = Executor::new(&self.registry);
        let execution = executor.execute(&ctx, &plan.actions);

        let previous_mode = self.previous_scene_mode(&state)?;
        let warnings = plan.soft_warnings(previous_mode, soft_action_limit);
        self.persist_plan(state.current_tick.0, &plan, &execution, &warnings)?;

        if !execution.success() {
            if let Some(id) = beat_id {
                let manager = OutlineManager::new(&self.store);
                manager.requeue_beat(id)?;
            }
            return Err(TickError::ToolExecutionHalted {
                index: execution.failed_action_index.unwrap_or(0),
                message: execution.error_message.unwrap_or_default(),
            });
        }

        let tool_result_summary = summarize_tool_results(&execution);

        let prepared = PreparedTick { pov_character, location, plan, execution, beat_target_description, beat_id, tool_result_summary };
        self.finish_tick(state, prepared, warnings)
    }

    /// §4.10.1 states 6-13, shared by both tick variants: write, evaluate,
    /// commit, score tension, extract facts, verify the beat and
    /// checkpoint, then advance `current_tick`.
    fn finish_tick(&self, mut state: ProjectState, prepared: PreparedTick, mut warnings: Vec<ConsistencyWarning>) -> Result<TickReport, TickError> {
        let PreparedTick { pov_character, location, plan, execution, beat_target_description, beat_id, tool_result_summary } = prepared;

        let writer_ctx = sd_planner::build_writer_context(
            &self.store,
            pov_character,
            location,
            self.config.generation.full_text_scenes_count,
            self.config.generation.summary_scenes_count,
            tool_result_summary,
            &plan,
            beat_target_description,
        )?;

        let writer = SceneWriter::new(self.llm, self.config.llm.writer_max_tokens, self.config.llm.timeout);
        let written = writer.write(&writer_ctx)?;

        let evaluation = check_word_count(
            written.word_count,
            self.config.generation.target_word_count_min,
            self.config.generation.target_word_count_max,
            plan.metadata.scene_length,
        )
        .and_then(|()| check_pov(&written.text));
        if let Err(err) = evaluation {
            // start_beat already moved this beat to InProgress; without
            // requeuing here it would never come back from get_next_beat
            // (§4.9, §8 #9).
            if let Some(id) = beat_id {
                OutlineManager::new(&self.store).requeue_beat(id)?;
            }
            return Err(err.into());
        }

        let scene_id = sd_core::ids::SceneId(self.store.next_id(EntityKind::Scene)?);
        self.store.write_scene_markdown(scene_id, &written.title, &written.text)?;
        let markdown_file = format!("scenes/scene_{:03}.md", scene_id.0);

        let mut scene = Scene {
            id: scene_id,
            tick: state.current_tick,
            title: written.title.clone(),
            pov_character_id: pov_character,
            location_id: location,
            markdown_file,
            word_count: written.word_count,
            summary: Vec::new(),
            characters_present: vec![pov_character],
            key_events: Vec::new(),
            entities_created: Vec::new(),
            entities_updated: Vec::new(),
            open_loops_created: Vec::new(),
            open_loops_resolved: Vec::new(),
            tension_level: None,
            tension_category: None,
            created_at: now_iso8601(),
            updated_at: now_iso8601(),
        };
        self.store.create_scene(&scene)?;

        let mut facts = ExtractedFacts::default();
        let mut update_warnings: Vec<ConsistencyWarning> = Vec::new();
        let mut new_active_character = None;

        if self.config.generation.enable_fact_extraction {
            let extractor = Extractor::new(self.llm, self.config.llm.extractor_max_tokens, self.config.llm.timeout);
            facts = extractor.extract(&written.text, &pov_character.to_string(), &location.to_string());
        }

        let tension = if self.config.generation.enable_tension_tracking {
            let inputs = TensionInputs {
                text: &written.text,
                loops_created: facts.open_loops_created.len(),
                loops_resolved: facts.open_loops_resolved.len(),
            };
            Some(score_tension(&inputs))
        } else {
            None
        };

        if self.config.generation.enable_entity_updates {
            // The *intended* POV identity the scene was written against
            // (the plan's `pov_character_name` override, if any, else the
            // stored `display_name` captured before writing) — not a fresh
            // reload of the stored record, which would always match itself
            // and make POV-switch detection unreachable (§4.8, §8 #8).
            let updater = Updater::new(&self.store, self.index);
            let outcome = updater.apply(state.current_tick, scene_id, pov_character, &writer_ctx.pov_character_name, &facts)?;
            update_warnings = outcome.warnings;
            new_active_character = outcome.new_active_character;
            scene.entities_updated = facts.character_updates.iter().map(|u| u.id.clone()).chain(facts.location_updates.iter().map(|u| u.id.clone())).collect();
        }

        let qa = if self.config.generation.verify_beat_execution {
            let evaluator = QaEvaluator::new(self.llm, self.config.llm.writer_max_tokens, self.config.llm.timeout);
            let recent_scene_summaries = recent_scene_titles(&self.store, self.config.generation.recent_scenes_count);
            match evaluator.evaluate(&written.text, &plan.scene_intention, &recent_scene_summaries) {
                Ok(record) => {
                    sd_core::atomic_io::write_json_atomic(&self.store.paths.scene_qa(scene_id), &record)?;
                    Some(record)
                }
                Err(err) => {
                    tracing::warn!(%err, "qa evaluation failed, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        if let Some(score) = &tension {
            scene.tension_level = Some(score.level);
            scene.tension_category = Some(score.category);
            state.tension_history.push(sd_core::model::TensionHistoryEntry { tick: state.current_tick, level: score.level, category: score.category });
        }
        self.store.save_scene(&mut scene)?;

        if let Some(id) = new_active_character {
            state.active_character = Some(id);
        }

        if let Some(beat_id) = beat_id {
            let manager = OutlineManager::new(&self.store);
            let satisfied = qa.as_ref().map(QaRecord::satisfies_beat_target).unwrap_or(true);
            if satisfied {
                manager.mark_beat_complete(beat_id, scene_id, written.title.clone(), state.current_tick)?;
            } else if self.config.generation.allow_beat_skip {
                manager.skip_beat(beat_id)?;
            } else {
                manager.requeue_beat(beat_id)?;
            }
        }

        warnings.extend(update_warnings);

        let completed_tick = state.current_tick;
        let outline = OutlineManager::new(&self.store).load()?;
        let checkpointer = Checkpointer::new(&self.store.paths);
        let checkpoint_taken = checkpointer.maybe_checkpoint(completed_tick.0, self.config.generation.checkpoint_summary_interval, &state, &outline)?;

        state.current_tick = state.current_tick.next();
        self.store.save_state(&state)?;

        Ok(TickReport {
            tick: completed_tick,
            scene_id,
            word_count: written.word_count,
            tension_level: tension.map(|t| t.level),
            checkpoint_taken,
            warnings,
        })
    }

    fn load_or_init_outline(&self) -> Result<PlotOutline, TickError> {
        Ok(OutlineManager::new(&self.store).load()?)
    }

    fn previous_scene_mode(&self, state: &ProjectState) -> Result<Option<sd_planner::SceneMode>, TickError> {
        if state.current_tick.0 == 0 {
            return Ok(None);
        }
        let Some(latest) = latest_scene(&self.store)? else { return Ok(None) };
        let raw = sd_core::atomic_io::read_json_opt::<PersistedPlanOwned>(&self.store.paths.plan(latest.tick.0))?;
        Ok(raw.and_then(|persisted| persisted.plan.scene_mode))
    }

    fn load_previous_qa_feedback(&self, state: &ProjectState) -> Result<Option<String>, TickError> {
        if state.current_tick.0 == 0 {
            return Ok(None);
        }
        let Some(latest) = latest_scene(&self.store)? else { return Ok(None) };
        let record: Option<QaRecord> = sd_core::atomic_io::read_json_opt(&self.store.paths.scene_qa(latest.id))?;
        Ok(record.map(|r| format_qa_feedback(&r)))
    }

    fn persist_plan(&self, tick: u64, plan: &Plan, execution: &ExecutionReport, warnings: &[ConsistencyWarning]) -> Result<(), TickError> {
        let persisted = PersistedPlan { tick, plan, execution, warnings };
        sd_core::atomic_io::write_json_atomic(&self.store.paths.plan(tick), &persisted)?;
        Ok(())
    }

    fn persist_error(&self, tick: u64, err: &TickError) -> Result<(), TickError> {
        let kind = err.kind();
        let record = PersistedError { tick, kind, message: err.to_string() };
        sd_core::atomic_io::write_json_atomic(&self.store.paths.error_json(tick), &record)?;
        sd_core::atomic_io::write_atomic(&self.store.paths.error_log(tick), format!("tick {tick} [{kind}]: {err}\n").as_bytes())?;
        Ok(())
    }
}

/// Resolve the writer's POV character and location from the plan's
/// requested ids, falling back to the project's current active character
/// and its last-known location (§4.10.1 state 3's output, §8 Scenario B).
fn resolve_pov_and_location(plan: &Plan, state: &ProjectState) -> Result<(CharacterId, LocationId), TickError> {
    let pov_character = match &plan.pov_character {
        Some(raw) => raw.parse::<CharacterId>().map_err(|_| TickError::PlanInvalid(format!("pov_character `{raw}` is not a valid character id")))?,
        None => state.active_character.ok_or_else(|| TickError::PlanInvalid("plan omits pov_character and no active character is set".to_string()))?,
    };
    let location = match &plan.target_location {
        Some(raw) => raw.parse::<LocationId>().map_err(|_| TickError::PlanInvalid(format!("target_location `{raw}` is not a valid location id")))?,
        None => return Err(TickError::PlanInvalid("plan omits target_location".to_string())),
    };
    Ok((pov_character, location))
}

/// Static descriptions of the registry's closed tool set, the planner's
/// `available_tools` context section (§4.4).
fn tool_catalogue(registry: &ToolRegistry) -> Vec<String> {
    let known: &[(&str, &str)] = &[
        ("memory.search", "memory.search(collection, query, k) - semantic search over characters, locations, scenes, lore or factions"),
        ("character.generate", "character.generate(name, role, description, ...) - create a new character"),
        ("character.update", "character.update(id, emotional_state, physical_state, inventory, goals, ...) - update an existing character's state"),
        ("location.generate", "location.generate(name, description, ...) - create a new location"),
        ("location.update", "location.update(id, tension_level, time_of_day, weather, occupants, ...) - update an existing location's state"),
        ("relationship.create", "relationship.create(character_a, character_b, relationship_type) - establish a relationship between two characters"),
        ("relationship.update", "relationship.update(character_a, character_b, status, event, intensity) - update an existing relationship"),
        ("relationship.query", "relationship.query(character_a, character_b) - look up the relationship between two characters"),
        ("faction.generate", "faction.generate(name, kind, summary) - create a new faction"),
        ("faction.update", "faction.update(id, summary, ...) - update an existing faction"),
        ("faction.query", "faction.query(id) - look up a faction"),
        ("name.generate", "name.generate(kind) - generate a plausible name for a new entity"),
    ];
    known.iter().filter(|(name, _)| registry.get(name).is_some()).map(|(_, desc)| desc.to_string()).collect()
}

/// A compact free-text summary of current story state for the beat
/// generator's single LLM call (§4.9).
fn summarize_story_state(state: &ProjectState, store: &EntityStore) -> Result<String, TickError> {
    let mut lines = Vec::new();
    lines.push(format!("Novel: {}", state.novel_name));
    if let Some(foundation) = &state.story_foundation {
        lines.push(format!("Genre: {}. Premise: {}", foundation.genre, foundation.premise));
    }
    if let Some(active) = state.active_character {
        if let Ok(character) = store.load_character(active) {
            lines.push(format!("Active character: {} ({})", character.display_name(), character.role));
        }
    }
    let loops = store.load_open_loops()?;
    let open = sd_memory::queries::top_open_loops(&loops, 5);
    if !open.is_empty() {
        lines.push("Open loops:".to_string());
        for loop_ in open {
            lines.push(format!("- {}", loop_.description));
        }
    }
    Ok(lines.join("\n"))
}

fn recent_scene_titles(store: &EntityStore, n: usize) -> Vec<String> {
    let Ok(mut scenes) = store.list_scenes() else { return Vec::new() };
    scenes.sort_by_key(|s| s.tick);
    scenes.into_iter().rev().take(n).map(|s| s.title).collect()
}

/// The most recently committed scene, or `None` on a project with no
/// scenes yet.
fn latest_scene(store: &EntityStore) -> Result<Option<Scene>, TickError> {
    let mut scenes = store.list_scenes()?;
    scenes.sort_by_key(|s| s.tick);
    Ok(scenes.pop())
}

fn format_qa_feedback(record: &QaRecord) -> String {
    let mut parts = Vec::new();
    if !record.met_target {
        parts.push("the previous scene missed its intended key change".to_string());
    }
    if record.mode_diversity_warning {
        parts.push("recent scenes have repeated the same mode too often".to_string());
    }
    for flag in &record.continuity_flags {
        parts.push(format!("continuity flag: {flag}"));
    }
    if parts.is_empty() {
        "the previous scene satisfied its QA checks".to_string()
    } else {
        parts.join("; ")
    }
}

/// Tool-result summary handed to the writer (§4.6): a one-line
/// description per successful action, in execution order.
fn summarize_tool_results(execution: &ExecutionReport) -> Vec<String> {
    execution.results.iter().map(describe_action_result).collect()
}

fn describe_action_result(result: &ActionResult) -> String {
    match result.tool.as_str() {
        "relationship.create" | "relationship.update" => format!("{}: {}", result.tool, result.args),
        _ => format!("{} established {}", result.tool, result.result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::model::{Character, CharacterState, Personality};

    fn sample_plan() -> Plan {
        Plan {
            rationale: "r".to_string(),
            scene_intention: "i".to_string(),
            key_change: "k".to_string(),
            actions: Vec::new(),
            expected_outcomes: Vec::new(),
            progress_milestone: None,
            progress_step: None,
            pov_character: Some("C1".to_string()),
            target_location: Some("L1".to_string()),
            loops_addressed: Vec::new(),
            scene_mode: None,
            palette_shift: Vec::new(),
            transition_path: None,
            dialogue_targets: None,
            beat_target: None,
            metadata: sd_planner::PlanMetadata::default(),
        }
    }

    #[test]
    fn resolves_pov_and_location_from_plan() {
        let state = ProjectState::new("Ashwake", "abcd1234");
        let (pov, loc) = resolve_pov_and_location(&sample_plan(), &state).unwrap();
        assert_eq!(pov, CharacterId(1));
        assert_eq!(loc, LocationId(1));
    }

    #[test]
    fn falls_back_to_active_character_when_plan_omits_pov() {
        let mut plan = sample_plan();
        plan.pov_character = None;
        let mut state = ProjectState::new("Ashwake", "abcd1234");
        state.active_character = Some(CharacterId(9));
        let (pov, _) = resolve_pov_and_location(&plan, &state).unwrap();
        assert_eq!(pov, CharacterId(9));
    }

    #[test]
    fn missing_pov_with_no_active_character_is_invalid() {
        let mut plan = sample_plan();
        plan.pov_character = None;
        let state = ProjectState::new("Ashwake", "abcd1234");
        assert!(resolve_pov_and_location(&plan, &state).is_err());
    }

    #[test]
    fn missing_target_location_is_invalid() {
        let mut plan = sample_plan();
        plan.target_location = None;
        let state = ProjectState::new("Ashwake", "abcd1234");
        assert!(resolve_pov_and_location(&plan, &state).is_err());
    }

    #[test]
    fn tool_catalogue_lists_every_registered_default_tool() {
        let registry = ToolRegistry::with_defaults();
        let catalogue = tool_catalogue(&registry);
        assert_eq!(catalogue.len(), registry.names().len());
    }

    fn sample_character(id: u32) -> Character {
        Character {
            id: CharacterId(id),
            first_name: "Elena".to_string(),
            family_name: "Voss".to_string(),
            title: None,
            nicknames: Vec::new(),
            role: "protagonist".to_string(),
            description: String::new(),
            physical_traits: String::new(),
            personality: Personality::default(),
            current_state: CharacterState::default(),
            immediate_goals: Vec::new(),
            arc_goal: None,
            story_goal: None,
            history: Vec::new(),
            created_at: now_iso8601(),
            updated_at: now_iso8601(),
        }
    }

    #[test]
    fn summarize_story_state_includes_active_character() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        std::fs::create_dir_all(store.paths.memory_dir()).unwrap();
        store.create_character(&sample_character(1)).unwrap();
        store.save_open_loops(&Vec::new()).unwrap();

        let mut state = ProjectState::new("Ashwake", "abcd1234");
        state.active_character = Some(CharacterId(1));
        let summary = summarize_story_state(&state, &store).unwrap();
        assert!(summary.contains("Elena"));
    }
}
