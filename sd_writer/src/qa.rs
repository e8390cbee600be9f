//! QA (§4.7): an optional LLM-assisted quality record, persisted next to
//! the scene and surfaced as `qa_feedback` in the following tick's
//! planner context.

use std::time::Duration;

use sd_llm::LlmClient;
use sd_planner::plan::strip_code_fence;
use serde::{Deserialize, Serialize};

use crate::errors::WriterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatHintAlignment {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub achieved_change: bool,
    pub dialogue_count: u32,
    pub met_target: bool,
    pub transition_clarity: u8,
    pub mode_used: Option<String>,
    pub mode_diversity_warning: bool,
    pub novelty_score: u8,
    #[serde(default)]
    pub continuity_flags: Vec<String>,
    pub beat_hint_alignment: BeatHintAlignment,
}

impl QaRecord {
    /// Whether the beat-verification step (§4.10.1 state 11) should treat
    /// this tick as having progressed its targeted beat.
    pub fn satisfies_beat_target(&self) -> bool {
        matches!(self.beat_hint_alignment, BeatHintAlignment::Medium | BeatHintAlignment::High)
    }
}

pub struct QaEvaluator<'a> {
    llm: &'a dyn LlmClient,
    max_tokens: u32,
    timeout: Duration,
}

impl<'a> QaEvaluator<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_tokens: u32, timeout: Duration) -> Self {
        QaEvaluator { llm, max_tokens, timeout }
    }

    pub fn evaluate(&self, prose: &str, scene_intention: &str, recent_scene_summaries: &[String]) -> Result<QaRecord, WriterError> {
        let prompt = format!(
            "Scene intention: {scene_intention}\n\nRecent scenes:\n{}\n\nScene text:\n{prose}\n\n\
Respond with a single JSON object: achieved_change (bool), dialogue_count (int), met_target (bool), \
transition_clarity (0-10), mode_used (string or null), mode_diversity_warning (bool), novelty_score (0-10), \
continuity_flags (array of strings), beat_hint_alignment (one of none/low/medium/high).",
            recent_scene_summaries.join("\n")
        );
        let raw = self.llm.generate(&prompt, self.max_tokens, self.timeout)?;
        let candidate = strip_code_fence(&raw);
        serde_json::from_str(candidate).map_err(|err| WriterError::Parse(err.to_string()))
    }
}
