//! `name.generate` (§4.3): a deterministic name generator. No RNG — the
//! same arguments always produce the same name, so a retried or replayed
//! tick (§7 "re-running the command attempts the same tick again")
//! doesn't drift.

use crate::errors::ToolResult;
use crate::registry::{Tool, ToolContext};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

const FIRST_NAMES_FEMININE: &[&str] =
    &["Elena", "Mirela", "Ysolde", "Katarin", "Brigh", "Aveline", "Soraya", "Dannika"];
const FIRST_NAMES_MASCULINE: &[&str] = &["Marcus", "Dorian", "Talvin", "Casimir", "Eamon", "Roderic", "Ilan", "Gideon"];
const FIRST_NAMES_NEUTRAL: &[&str] = &["Ari", "Rowan", "Sael", "Quill", "Bryn", "Lior", "Tamsin", "Noor"];
const FAMILY_NAMES: &[&str] = &["Thorne", "Vale", "Ashcombe", "Brennick", "Duskward", "Ferrow", "Holt", "Marrow"];

fn hashed_pick<'a>(args: &serde_json::Value, salt: &str, pool: &'a [&'a str]) -> &'a str {
    let mut hasher = FxHasher::default();
    args.to_string().hash(&mut hasher);
    salt.hash(&mut hasher);
    let index = (hasher.finish() as usize) % pool.len();
    pool[index]
}

pub struct NameGenerate;

impl Tool for NameGenerate {
    fn name(&self) -> &'static str {
        "name.generate"
    }

    fn execute(&self, _ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value> {
        let kind = args.get("kind").and_then(|v| v.as_str()).unwrap_or("full");
        let gender = args.get("gender").and_then(|v| v.as_str()).unwrap_or("neutral");

        let first_pool = match gender {
            "feminine" => FIRST_NAMES_FEMININE,
            "masculine" => FIRST_NAMES_MASCULINE,
            _ => FIRST_NAMES_NEUTRAL,
        };
        let first = hashed_pick(args, "first", first_pool);
        let family = hashed_pick(args, "family", FAMILY_NAMES);

        let name = match kind {
            "first" => first.to_string(),
            "family" => family.to_string(),
            _ => format!("{first} {family}"),
        };
        Ok(serde_json::json!({ "name": name }))
    }
}
