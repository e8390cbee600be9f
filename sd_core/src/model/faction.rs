use crate::ids::{CharacterId, FactionId};
use std::collections::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    #[serde(default)]
    pub mandate_objectives: Vec<String>,
    #[serde(default)]
    pub influence_domains: Vec<String>,
    #[serde(default)]
    pub assets_resources: Vec<String>,
    #[serde(default)]
    pub methods_tactics: Vec<String>,
    #[serde(default)]
    pub stance_by_character: HashMap<CharacterId, String>,
    #[serde(default)]
    pub relationships: Vec<String>,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

// `CharacterId` needs to be usable as a HashMap key in serde_json, which
// requires it to serialize to a string (it does, via the manual `Serialize`
// impl in `ids.rs`) and implement `Eq + Hash` (it does, derived).
