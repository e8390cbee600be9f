//! Scene Writer (§4.6): renders the writer context into a prompt and
//! parses the LLM's prose response into `{text, word_count, title}`.

use std::time::Duration;

use sd_llm::LlmClient;
use sd_planner::WriterContext;

use crate::errors::WriterError;

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenScene {
    pub title: String,
    pub text: String,
    pub word_count: usize,
}

pub struct SceneWriter<'a> {
    llm: &'a dyn LlmClient,
    max_tokens: u32,
    timeout: Duration,
}

impl<'a> SceneWriter<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_tokens: u32, timeout: Duration) -> Self {
        SceneWriter { llm, max_tokens, timeout }
    }

    pub fn write(&self, ctx: &WriterContext) -> Result<WrittenScene, WriterError> {
        let prompt = render_writer_prompt(ctx);
        let raw = self.llm.generate(&prompt, self.max_tokens, self.timeout)?;
        if raw.trim().is_empty() {
            return Err(WriterError::Parse("writer returned empty prose".to_string()));
        }
        Ok(parse_scene_response(&raw, &ctx.scene_intention))
    }
}

pub fn render_writer_prompt(ctx: &WriterContext) -> String {
    let mut sections = Vec::new();

    sections.push(ctx.pov_rule.clone());
    sections.push(ctx.name_use_rule.clone());
    sections.push("Do not use omniscient narration markers (\"unknown to\", \"little did\", \"meanwhile\", etc.).".to_string());

    sections.push(format!(
        "POV character: {} ({}). Current state: {}",
        ctx.pov_character_name,
        ctx.pov_character.role,
        ctx.pov_character.current_state.emotional_state
    ));
    sections.push(format!("Location: {}. {}", ctx.location.name, ctx.location.description));

    if !ctx.summary_scenes.is_empty() {
        sections.push(format!("Earlier scenes:\n{}", ctx.summary_scenes.join("\n")));
    }
    for (title, prose) in &ctx.full_text_scenes {
        sections.push(format!("Previous scene \"{title}\":\n{prose}"));
    }

    sections.push(format!("Scene intention: {}", ctx.scene_intention));
    sections.push(format!("Key change this scene must accomplish: {}", ctx.key_change));

    if let Some(mode) = &ctx.scene_mode {
        sections.push(format!("Scene mode: {mode}"));
    }
    if !ctx.palette_shift.is_empty() {
        sections.push(format!("Apply these sensory details: {}", ctx.palette_shift.join(", ")));
    }
    if let Some(path) = &ctx.transition_path {
        sections.push(format!("Bridge from the previous location/time via: {path}"));
    }
    if let Some(min_exchanges) = ctx.dialogue_min_exchanges {
        sections.push(format!(
            "Include at least {min_exchanges} dialogue exchanges with a visible decision or power shift."
        ));
    }
    if !ctx.loops_addressed.is_empty() {
        sections.push(format!("Address these open threads: {}", ctx.loops_addressed.join(", ")));
    }
    if let Some(beat) = &ctx.beat_target_description {
        sections.push(format!("This scene must accomplish plot beat: {beat}"));
    }
    if !ctx.tool_result_summary.is_empty() {
        sections.push(format!("Established facts from this tick's tool calls:\n{}", ctx.tool_result_summary.join("\n")));
    }

    sections.push(
        "Write the scene in prose. Optionally begin with a short title line (no period at the end), then the scene text."
            .to_string(),
    );

    sections.join("\n\n")
}

/// Parse the writer's raw output into `{title, text, word_count}` per §8
/// invariant #7: a short, non-sentence-terminated first line becomes the
/// title (stripped of a leading `#` and trailing punctuation); otherwise
/// the title is synthesized from `scene_intention`, truncated at a word
/// boundary within 60 characters.
pub fn parse_scene_response(raw: &str, scene_intention: &str) -> WrittenScene {
    let trimmed = raw.trim();
    let first_line = trimmed.lines().enumerate().find(|(_, line)| !line.trim().is_empty());

    let (title, body) = match first_line {
        Some((idx, line)) => {
            let candidate = line.trim().trim_start_matches('#').trim();
            let sentence_terminated = candidate.ends_with(['.', '!', '?']);
            if !candidate.is_empty() && candidate.chars().count() <= 60 && !sentence_terminated {
                let body = trimmed.lines().skip(idx + 1).collect::<Vec<_>>().join("\n").trim().to_string();
                (strip_trailing_punctuation(candidate), body)
            } else {
                (truncate_title_from_intention(scene_intention), trimmed.to_string())
            }
        }
        None => (truncate_title_from_intention(scene_intention), String::new()),
    };

    let word_count = body.split_whitespace().count();
    WrittenScene { title, text: body, word_count }
}

fn strip_trailing_punctuation(s: &str) -> String {
    s.trim_end_matches(|c: char| c.is_ascii_punctuation()).to_string()
}

fn truncate_title_from_intention(intention: &str) -> String {
    let mut result = String::new();
    for word in intention.split_whitespace() {
        let candidate_len = if result.is_empty() { word.len() } else { result.len() + 1 + word.len() };
        if candidate_len > 60 {
            break;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }
    strip_trailing_punctuation(&result)
}
