//! Fact Extractor (§4.8): a strict-JSON extraction pass over committed
//! scene prose. Conservative by prompt design — only explicit or strongly
//! implied facts are meant to come back — and tolerant of a flaky backend
//! by retrying once before degrading to an empty extraction rather than
//! failing the tick (§4.10.3 `FactExtractionError`).

use std::time::Duration;

use sd_llm::LlmClient;
use sd_planner::plan::strip_code_fence;
use serde::{Deserialize, Serialize};

use crate::errors::FactExtractionError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterUpdateFact {
    pub id: String,
    #[serde(default)]
    pub changes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationUpdateFact {
    pub id: String,
    #[serde(default)]
    pub changes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenLoopCreateFact {
    pub description: String,
    #[serde(default)]
    pub importance: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub related_characters: Vec<String>,
    #[serde(default)]
    pub related_locations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipChangeFact {
    pub character_a: String,
    pub character_b: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub intensity: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoreFact {
    pub fact: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub importance: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The Extractor's strict-JSON output shape (§4.8). Every field defaults to
/// empty so a scene with nothing extractable still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFacts {
    #[serde(default)]
    pub character_updates: Vec<CharacterUpdateFact>,
    #[serde(default)]
    pub location_updates: Vec<LocationUpdateFact>,
    #[serde(default)]
    pub open_loops_created: Vec<OpenLoopCreateFact>,
    #[serde(default)]
    pub open_loops_resolved: Vec<String>,
    #[serde(default)]
    pub relationship_changes: Vec<RelationshipChangeFact>,
    #[serde(default)]
    pub lore: Vec<LoreFact>,
}

pub struct Extractor<'a> {
    llm: &'a dyn LlmClient,
    max_tokens: u32,
    timeout: Duration,
}

impl<'a> Extractor<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_tokens: u32, timeout: Duration) -> Self {
        Extractor { llm, max_tokens, timeout }
    }

    /// Extract facts from `prose`, retrying the LLM call once on a parse
    /// failure. If both attempts fail, returns an empty `ExtractedFacts`
    /// rather than an error — the scene stays committed regardless (§4.8,
    /// §4.10.3).
    pub fn extract(&self, prose: &str, pov_character_id: &str, location_id: &str) -> ExtractedFacts {
        match self.try_extract(prose, pov_character_id, location_id) {
            Ok(facts) => facts,
            Err(first_err) => {
                tracing::warn!(error = %first_err, "fact extraction failed, retrying once");
                match self.try_extract(prose, pov_character_id, location_id) {
                    Ok(facts) => facts,
                    Err(second_err) => {
                        tracing::warn!(error = %second_err, "fact extraction failed twice, skipping extraction");
                        ExtractedFacts::default()
                    }
                }
            }
        }
    }

    fn try_extract(&self, prose: &str, pov_character_id: &str, location_id: &str) -> Result<ExtractedFacts, FactExtractionError> {
        let prompt = render_extraction_prompt(prose, pov_character_id, location_id);
        let raw = self.llm.generate(&prompt, self.max_tokens, self.timeout)?;
        let candidate = strip_code_fence(&raw);
        serde_json::from_str(candidate).map_err(|err| FactExtractionError::Parse(err.to_string()))
    }
}

fn render_extraction_prompt(prose: &str, pov_character_id: &str, location_id: &str) -> String {
    format!(
        "POV character: {pov_character_id}\nLocation: {location_id}\n\nScene text:\n{prose}\n\n\
Extract only facts that are explicit or strongly implied. Respond with a single JSON object: \
character_updates (array of {{id, changes: {{emotional_state?, physical_state?, inventory?, goals?, beliefs?}}}}), \
location_updates (array of {{id, changes: {{description?, atmosphere?, features?}}}}), \
open_loops_created (array of {{description, importance, category, related_characters, related_locations}}), \
open_loops_resolved (array of loop ids), \
relationship_changes (array of {{character_a, character_b, status?, event?, intensity?}}), \
lore (array of {{fact, category, importance, tags?}}). Omit a section entirely if nothing applies."
    )
}
