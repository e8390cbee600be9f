//! Deterministic prose checks (§4.7): word count range and POV heuristics.
//! These run synchronously, no LLM involved, and their failures are the
//! "fatal band" that raises `SceneEvaluationFailed` in the orchestrator.

use sd_planner::SceneLength;

use crate::errors::EvaluationError;

const OMNISCIENT_PHRASES: [&str; 5] = ["unknown to", "little did", "would later", "meanwhile", "at that moment"];
const FIRST_PERSON_PRONOUNS: [&str; 7] = ["i", "me", "my", "mine", "we", "us", "our"];

/// Word count within `[min, max]`, soft (warn-only) for `brief`/`extended`
/// scene lengths.
pub fn check_word_count(word_count: usize, min: usize, max: usize, scene_length: Option<SceneLength>) -> Result<(), EvaluationError> {
    if word_count >= min && word_count <= max {
        return Ok(());
    }
    let soft = matches!(scene_length, Some(SceneLength::Brief) | Some(SceneLength::Extended));
    if soft {
        tracing::warn!(word_count, min, max, ?scene_length, "word count outside target range, tolerated for this scene length");
        Ok(())
    } else {
        Err(EvaluationError::WordCount { actual: word_count, min, max })
    }
}

/// Rejects omniscient-narration markers and first-person pronouns found
/// outside quoted speech.
pub fn check_pov(text: &str) -> Result<(), EvaluationError> {
    let lower = text.to_lowercase();
    if let Some(phrase) = OMNISCIENT_PHRASES.iter().find(|phrase| lower.contains(*phrase)) {
        return Err(EvaluationError::PovViolation(format!("omniscient narration marker found: \"{phrase}\"")));
    }
    if contains_first_person_pronoun(text) {
        return Err(EvaluationError::PovViolation("first-person pronoun found outside quoted speech".to_string()));
    }
    Ok(())
}

fn contains_first_person_pronoun(text: &str) -> bool {
    let narration_only = strip_quoted_speech(text).to_lowercase();
    narration_only.split(|c: char| !c.is_alphanumeric()).any(|word| FIRST_PERSON_PRONOUNS.contains(&word))
}

/// Replace the contents of `"..."`-quoted spans with spaces so pronoun
/// checks only see narration, not dialogue.
fn strip_quoted_speech(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_quote = false;
    for ch in text.chars() {
        if ch == '"' {
            in_quote = !in_quote;
            result.push(' ');
            continue;
        }
        result.push(if in_quote { ' ' } else { ch });
    }
    result
}
