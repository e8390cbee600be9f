//! LLM-driven beat generation (§4.9 `generate_next_beats`).

use std::time::Duration;

use sd_core::ids::EntityKind;
use sd_core::model::plot::{BeatStatus, PlotBeat};
use sd_core::time::now_iso8601;
use sd_core::ids::{CharacterId, LocationId, OpenLoopId, PlotBeatId};
use sd_llm::LlmClient;
use sd_planner::plan::strip_code_fence;
use sd_store::EntityStore;
use serde::Deserialize;

use crate::errors::BeatGenerationError;

/// What the LLM is allowed to propose for a beat. Notably absent:
/// `id`, `status`, `created_at`, `executed_in_scene` — those fields are
/// system-owned and assigned by the manager after generation (§4.9).
#[derive(Debug, Clone, Default, Deserialize)]
struct DraftBeat {
    description: String,
    #[serde(default)]
    characters_involved: Vec<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    plot_threads: Vec<String>,
    #[serde(default)]
    tension_target: Option<u8>,
    #[serde(default)]
    prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DraftBeats {
    #[serde(default)]
    beats: Vec<DraftBeat>,
}

pub struct BeatGenerator<'a> {
    llm: &'a dyn LlmClient,
    max_tokens: u32,
    timeout: Duration,
}

impl<'a> BeatGenerator<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_tokens: u32, timeout: Duration) -> Self {
        BeatGenerator { llm, max_tokens, timeout }
    }

    /// Generates `n` new beats from `story_state_summary`, assigning ids
    /// through `store`'s counters and filling in the system-owned fields
    /// the LLM never sees. Unresolvable character/location references
    /// in the draft are dropped rather than failing the whole call, since
    /// they're advisory hints the writer isn't bound to honor anyway.
    pub fn generate_next_beats(&self, n: usize, story_state_summary: &str, store: &EntityStore) -> Result<Vec<PlotBeat>, BeatGenerationError> {
        let prompt = render_generation_prompt(n, story_state_summary);
        let raw = self.llm.generate(&prompt, self.max_tokens, self.timeout)?;
        let candidate = strip_code_fence(&raw);
        let drafts: DraftBeats = serde_json::from_str(candidate).map_err(|err| BeatGenerationError::Parse(err.to_string()))?;

        let mut beats = Vec::with_capacity(drafts.beats.len());
        for draft in drafts.beats {
            let id = PlotBeatId::new(store.next_id(EntityKind::PlotBeat)?);
            beats.push(PlotBeat {
                id,
                description: draft.description,
                characters_involved: draft.characters_involved.iter().filter_map(|s| s.parse::<CharacterId>().ok()).collect(),
                location: draft.location.and_then(|s| s.parse::<LocationId>().ok()),
                plot_threads: draft.plot_threads,
                tension_target: draft.tension_target,
                prerequisites: draft.prerequisites.iter().filter_map(|s| s.parse::<PlotBeatId>().ok()).collect(),
                status: BeatStatus::Pending,
                created_at: now_iso8601(),
                executed_in_scene: None,
                execution_notes: String::new(),
                advances_character_arcs: Vec::new(),
                resolves_loops: Vec::new(),
                creates_loops: Vec::<OpenLoopId>::new(),
            });
        }
        Ok(beats)
    }
}

fn render_generation_prompt(n: usize, story_state_summary: &str) -> String {
    format!(
        "Story state:\n{story_state_summary}\n\nPropose {n} upcoming plot beats that build on what has already happened. \
Respond with a single JSON object: {{\"beats\": [{{description, characters_involved, location, plot_threads, \
tension_target (0-10), prerequisites (descriptions or ids of beats that must happen first)}}]}}. \
Do not set id, status, created_at, or executed_in_scene — those are assigned by the outline manager."
    )
}
