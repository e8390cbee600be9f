//! Context Builders (§4.4): assemble the planner and writer prompts from
//! the Entity Store and semantic queries, honoring token budgets.

use sd_core::errors::StoreResult;
use sd_core::estimate_tokens;
use sd_core::ids::{CharacterId, LocationId};
use sd_core::model::{Character, Location, ProjectState};
use sd_memory::queries::{prioritized_open_loops, relationships_for};
use sd_store::EntityStore;

fn section_tokens(items: &[String]) -> usize {
    items.iter().map(|s| estimate_tokens(s)).sum()
}

/// Planner context (§4.4): used by Stage 3 of the multi-stage planner and
/// by the single-stage fallback.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PlannerContext {
    pub novel_name: String,
    pub current_tick: u64,
    pub active_character_summary: String,
    /// One bullet per scene, in tick order.
    pub overall_summary: Vec<String>,
    /// Last N scenes, each rendered as its full bullet summary.
    pub recent_scene_summaries: Vec<String>,
    /// Highest importance first, ties by `last_mentioned_tick` descending.
    pub prioritized_open_loops: Vec<String>,
    pub protagonist_relationships: Vec<String>,
    /// Last 5 `(level, category)` entries, oldest first.
    pub tension_history: Vec<(u8, String)>,
    pub faction_summaries: Vec<String>,
    pub available_tools: Vec<String>,
    pub beat_target: Option<String>,
    pub qa_feedback: Option<String>,
    /// Stage 2's semantic-gather hits, folded into the Stage 3 prompt
    /// (§4.5). Empty for the single-stage fallback, which has no
    /// separate gather step.
    pub gathered_scenes: Vec<String>,
    pub gathered_lore: Vec<String>,
    /// Stage 2's query-relevant open loops, distinct from
    /// `prioritized_open_loops` (which is importance-ordered, not
    /// relevance-scored against `scene_intention`).
    pub gathered_open_loops: Vec<String>,
}

impl PlannerContext {
    pub fn total_tokens(&self) -> usize {
        estimate_tokens(&self.active_character_summary)
            + section_tokens(&self.overall_summary)
            + section_tokens(&self.recent_scene_summaries)
            + section_tokens(&self.prioritized_open_loops)
            + section_tokens(&self.protagonist_relationships)
            + section_tokens(&self.faction_summaries)
            + section_tokens(&self.gathered_scenes)
            + section_tokens(&self.gathered_lore)
            + section_tokens(&self.gathered_open_loops)
            + self.qa_feedback.as_deref().map(estimate_tokens).unwrap_or(0)
            + self.beat_target.as_deref().map(estimate_tokens).unwrap_or(0)
    }

    /// Truncate the context to fit `budget` tokens: repeatedly drop the
    /// last item from whichever list section currently holds the most
    /// tokens (§4.4 "longest-section-first truncation") until it fits or
    /// nothing is left to trim.
    pub fn enforce_budget(&mut self, budget: usize) {
        loop {
            if self.total_tokens() <= budget {
                return;
            }
            let sizes = [
                (0u8, section_tokens(&self.overall_summary)),
                (1u8, section_tokens(&self.recent_scene_summaries)),
                (2u8, section_tokens(&self.prioritized_open_loops)),
                (3u8, section_tokens(&self.protagonist_relationships)),
                (4u8, section_tokens(&self.faction_summaries)),
                (5u8, section_tokens(&self.gathered_scenes)),
                (6u8, section_tokens(&self.gathered_lore)),
                (7u8, section_tokens(&self.gathered_open_loops)),
            ];
            let (longest, tokens) = *sizes.iter().max_by_key(|(_, n)| *n).unwrap();
            if tokens == 0 {
                return; // nothing left to trim; let the caller send it over budget
            }
            let popped = match longest {
                0 => self.overall_summary.pop(),
                1 => self.recent_scene_summaries.pop(),
                2 => self.prioritized_open_loops.pop(),
                3 => self.protagonist_relationships.pop(),
                4 => self.faction_summaries.pop(),
                5 => self.gathered_scenes.pop(),
                6 => self.gathered_lore.pop(),
                _ => self.gathered_open_loops.pop(),
            };
            if popped.is_none() {
                return;
            }
        }
    }
}

/// Writer context (§4.4): assembled after Stage 3 plans the scene.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WriterContext {
    /// Last `full_text_count` scenes, full prose.
    pub full_text_scenes: Vec<(String, String)>,
    /// Older scenes, summarized as bullets.
    pub summary_scenes: Vec<String>,
    pub pov_character: Character,
    /// The name the scene is intended to use for its POV character — the
    /// plan's `pov_character_name` override if set, else the resolved
    /// character's stored `display_name`. Carried verbatim to the Entity
    /// Updater after the scene is written so POV-switch detection (§4.8)
    /// compares against the *intended* identity rather than re-deriving
    /// the stored name and comparing it against itself.
    pub pov_character_name: String,
    pub location: Location,
    /// Tool-result summary lines; entity-generator actions are filtered
    /// out on tick 0 (§4.10.2) so the writer treats them as pre-existing.
    pub tool_result_summary: Vec<String>,
    pub scene_intention: String,
    pub key_change: String,
    pub scene_mode: Option<String>,
    pub palette_shift: Vec<String>,
    pub transition_path: Option<String>,
    pub dialogue_min_exchanges: Option<u32>,
    pub loops_addressed: Vec<String>,
    pub beat_target_description: Option<String>,
    pub pov_rule: String,
    pub name_use_rule: String,
}

/// Assemble §4.4's planner context. `tool_descriptions` is the catalogue
/// the tactical stage also receives verbatim.
pub fn build_planner_context(
    store: &EntityStore,
    state: &ProjectState,
    recent_scenes_count: usize,
    beat_target: Option<&str>,
    qa_feedback: Option<&str>,
    tool_descriptions: &[String],
) -> StoreResult<PlannerContext> {
    let mut scenes = store.list_scenes()?;
    scenes.sort_by_key(|s| s.tick.0);

    let overall_summary: Vec<String> = scenes
        .iter()
        .map(|s| s.summary.first().cloned().unwrap_or_else(|| s.title.clone()))
        .collect();

    let recent_scene_summaries: Vec<String> = scenes
        .iter()
        .rev()
        .take(recent_scenes_count)
        .rev()
        .map(|s| format!("Scene {} ({}): {}", s.id, s.title, s.summary.join(" ")))
        .collect();

    let active_character_summary = match state.active_character {
        Some(id) => {
            let character = store.load_character(id)?;
            format!("{} ({}): {}", character.display_name(), character.role, character.description)
        }
        None => String::new(),
    };

    let open_loops = store.load_open_loops()?;
    let prioritized_open_loops: Vec<String> = prioritized_open_loops(&open_loops)
        .into_iter()
        .map(|l| format!("[{:?}] {} ({})", l.importance, l.description, l.category))
        .collect();

    let protagonist_relationships: Vec<String> = match state.active_character {
        Some(id) => {
            let relationships = store.load_relationships()?;
            relationships_for(&relationships, id)
                .into_iter()
                .map(|r| format!("{} with {} (intensity {})", r.relationship_type, other_side(r, id), r.intensity))
                .collect()
        }
        None => Vec::new(),
    };

    let tension_history: Vec<(u8, String)> =
        state.recent_tension(5).iter().map(|entry| (entry.level, format!("{:?}", entry.category))).collect();

    let faction_summaries: Vec<String> =
        store.list_factions()?.iter().map(|f| format!("{} ({}): {}", f.name, f.kind, f.summary)).collect();

    Ok(PlannerContext {
        novel_name: state.novel_name.clone(),
        current_tick: state.current_tick.0,
        active_character_summary,
        overall_summary,
        recent_scene_summaries,
        prioritized_open_loops,
        protagonist_relationships,
        tension_history,
        faction_summaries,
        available_tools: tool_descriptions.to_vec(),
        beat_target: beat_target.map(str::to_string),
        qa_feedback: qa_feedback.map(str::to_string),
        gathered_scenes: Vec::new(),
        gathered_lore: Vec::new(),
        gathered_open_loops: Vec::new(),
    })
}

fn other_side(r: &sd_core::model::Relationship, character: CharacterId) -> CharacterId {
    if r.character_a == character { r.character_b } else { r.character_a }
}

/// Assemble §4.4's writer context. `tool_result_summary` is supplied
/// pre-filtered by the orchestrator (it alone knows whether this is the
/// first-tick bootstrap that must hide generator actions).
#[allow(clippy::too_many_arguments)]
pub fn build_writer_context(
    store: &EntityStore,
    pov_character_id: CharacterId,
    location_id: LocationId,
    full_text_count: usize,
    summary_count: usize,
    tool_result_summary: Vec<String>,
    plan: &crate::plan::Plan,
    beat_target_description: Option<String>,
) -> StoreResult<WriterContext> {
    let mut scenes = store.list_scenes()?;
    scenes.sort_by_key(|s| s.tick.0);

    let mut full_text_scenes = Vec::new();
    for scene in scenes.iter().rev().take(full_text_count).rev() {
        let path = store.paths.scene_markdown(scene.id);
        let prose = std::fs::read_to_string(&path).unwrap_or_default();
        full_text_scenes.push((scene.title.clone(), prose));
    }

    let older_count = scenes.len().saturating_sub(full_text_count);
    let summary_scenes: Vec<String> = scenes
        .iter()
        .take(older_count)
        .rev()
        .take(summary_count)
        .rev()
        .map(|s| format!("Scene {} ({}): {}", s.id, s.title, s.summary.join(" ")))
        .collect();

    let pov_character = store.load_character(pov_character_id)?;
    let location = store.load_location(location_id)?;
    let pov_character_name = plan.pov_character_name.clone().unwrap_or_else(|| pov_character.display_name().to_string());

    Ok(WriterContext {
        full_text_scenes,
        summary_scenes,
        pov_rule: format!(
            "Write in third-person deep POV filtered entirely through {}'s perception.",
            pov_character_name
        ),
        name_use_rule: format!(
            "Refer to the POV character as \"{}\" or by pronoun; never use a placeholder name.",
            pov_character_name
        ),
        pov_character,
        pov_character_name,
        location,
        tool_result_summary,
        scene_intention: plan.scene_intention.clone(),
        key_change: plan.key_change.clone(),
        scene_mode: plan.scene_mode.map(|m| format!("{m:?}")),
        palette_shift: plan.palette_shift.clone(),
        transition_path: plan.transition_path.clone(),
        dialogue_min_exchanges: plan.dialogue_targets.as_ref().and_then(|d| d.min_exchanges),
        loops_addressed: plan.loops_addressed.clone(),
        beat_target_description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::time::Tick;
    use tempfile::tempdir;

    fn sample_state() -> ProjectState {
        ProjectState::new("Ashwake", "a1b2c3d4")
    }

    #[test]
    fn planner_context_is_empty_for_fresh_project() {
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let ctx = build_planner_context(&store, &sample_state(), 3, None, None, &[]).unwrap();
        assert_eq!(ctx.novel_name, "Ashwake");
        assert!(ctx.overall_summary.is_empty());
        assert!(ctx.active_character_summary.is_empty());
    }

    #[test]
    fn enforce_budget_drops_from_longest_section_first() {
        let mut ctx = PlannerContext {
            overall_summary: vec!["a short bullet".to_string(); 2],
            prioritized_open_loops: vec!["a much longer open loop description here indeed".to_string(); 5],
            ..Default::default()
        };
        let before = ctx.total_tokens();
        ctx.enforce_budget(before / 2);
        assert!(ctx.total_tokens() <= before);
        // the much larger `prioritized_open_loops` section should have
        // been trimmed before the smaller `overall_summary` section.
        assert!(ctx.prioritized_open_loops.len() < 5);
    }

    #[test]
    fn enforce_budget_gives_up_gracefully_when_nothing_left_to_trim() {
        let mut ctx = PlannerContext { active_character_summary: "irreducible".to_string(), ..Default::default() };
        ctx.enforce_budget(0);
        assert_eq!(ctx.active_character_summary, "irreducible");
    }

    #[test]
    fn tension_history_reflects_state() {
        let mut state = sample_state();
        state.tension_history.push(sd_core::model::TensionHistoryEntry {
            tick: Tick(0),
            level: 4,
            category: sd_core::model::tension_category_for(4).unwrap(),
        });
        let dir = tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let ctx = build_planner_context(&store, &state, 3, None, None, &[]).unwrap();
        assert_eq!(ctx.tension_history, vec![(4, "Rising".to_string())]);
    }
}
