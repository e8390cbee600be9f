//! Tension evaluator (§4.7): a weighted 0–10 score from keyword
//! incidence (40%), sentence-length distribution (20%), emotional-
//! intensity tokens (30%) and loop-delta (10%), banded by
//! `sd_core::model::tension_category_for`.

use sd_core::model::{tension_category_for, TensionCategory};

const TENSION_KEYWORDS: &[&str] =
    &["danger", "threat", "fight", "weapon", "enemy", "betray", "scream", "blood", "urgent", "crisis", "chase", "trap"];

const EMOTIONAL_INTENSITY_TOKENS: &[&str] =
    &["rage", "terror", "desperate", "anguish", "panic", "fury", "dread", "trembling", "gasped", "heart pounding"];

#[derive(Debug, Clone, Copy)]
pub struct TensionInputs<'a> {
    pub text: &'a str,
    pub loops_created: usize,
    pub loops_resolved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensionScore {
    pub level: u8,
    pub category: TensionCategory,
}

/// Score `inputs.text` against the weighted rubric and band it. Never
/// panics: the underlying component scores are already clamped into
/// `0..=10` before `tension_category_for` sees them.
pub fn score_tension(inputs: &TensionInputs) -> TensionScore {
    let keyword = incidence_score(inputs.text, TENSION_KEYWORDS);
    let sentence = sentence_length_score(inputs.text);
    let emotional = incidence_score(inputs.text, EMOTIONAL_INTENSITY_TOKENS);
    let loop_delta = loop_delta_score(inputs.loops_created, inputs.loops_resolved);

    let weighted = keyword * 0.4 + sentence * 0.2 + emotional * 0.3 + loop_delta * 0.1;
    let level = weighted.round().clamp(0.0, 10.0) as u8;
    let category = tension_category_for(level).expect("weighted score is clamped into 0..=10");
    TensionScore { level, category }
}

/// Hits per 100 words, scaled to `0..=10` and capped there.
fn incidence_score(text: &str, keywords: &[&str]) -> f32 {
    let lower = text.to_lowercase();
    let word_count = lower.split_whitespace().count().max(1);
    let hits: usize = keywords.iter().map(|kw| lower.matches(kw).count()).sum();
    let per_hundred = (hits as f32 / word_count as f32) * 100.0;
    (per_hundred * 3.0).min(10.0)
}

/// Shorter average sentence length reads as higher tension (quick cuts).
/// An 8-word average or below scores 10; 30 words or above scores 0.
fn sentence_length_score(text: &str) -> f32 {
    let sentences: Vec<&str> = text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty()).collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let total_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    let avg = total_words as f32 / sentences.len() as f32;
    ((30.0 - avg) / 22.0 * 10.0).clamp(0.0, 10.0)
}

/// +1 per loop created, −1 per loop resolved, centered on a neutral 5.
fn loop_delta_score(created: usize, resolved: usize) -> f32 {
    let delta = created as i64 - resolved as i64;
    (5.0 + delta as f32).clamp(0.0, 10.0)
}
