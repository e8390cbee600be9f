//! Tool Registry (§4.3): a closed set of named, schema-validated tools
//! registered once at orchestrator startup. No runtime monkey-patching —
//! the agent-visible surface is exactly the set registered here.

use crate::errors::ToolResult;
use sd_llm::VectorIndex;
use sd_store::EntityStore;
use std::collections::HashMap;

/// Everything a tool needs to read or mutate project state. Borrowed for
/// the duration of one `Executor::execute` call.
pub struct ToolContext<'a> {
    pub store: &'a EntityStore,
    pub index: &'a dyn VectorIndex,
}

pub trait Tool: Send + Sync {
    /// The name the planner's `actions[].tool` field must match exactly,
    /// e.g. `"character.generate"`.
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &ToolContext<'_>, args: &serde_json::Value) -> ToolResult<serde_json::Value>;
}

/// Named-tool lookup (§4.3). Built once by the orchestrator with
/// `ToolRegistry::with_defaults` and shared read-only thereafter.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Registers every tool the core ships (§4.3's named list). The
    /// orchestrator calls this once; no other registration path exists.
    pub fn with_defaults() -> Self {
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(crate::tools::memory_search::MemorySearch))
            .register(Box::new(crate::tools::character::CharacterGenerate))
            .register(Box::new(crate::tools::character::CharacterUpdate))
            .register(Box::new(crate::tools::location::LocationGenerate))
            .register(Box::new(crate::tools::location::LocationUpdate))
            .register(Box::new(crate::tools::relationship::RelationshipCreate))
            .register(Box::new(crate::tools::relationship::RelationshipUpdate))
            .register(Box::new(crate::tools::relationship::RelationshipQuery))
            .register(Box::new(crate::tools::faction::FactionGenerate))
            .register(Box::new(crate::tools::faction::FactionUpdate))
            .register(Box::new(crate::tools::faction::FactionQuery))
            .register(Box::new(crate::tools::name::NameGenerate));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_registers_every_documented_tool() {
        let registry = ToolRegistry::with_defaults();
        let names = registry.names();
        for expected in [
            "memory.search",
            "character.generate",
            "character.update",
            "location.generate",
            "location.update",
            "relationship.create",
            "relationship.update",
            "relationship.query",
            "faction.generate",
            "faction.update",
            "faction.query",
            "name.generate",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }

    #[test]
    fn unknown_tool_returns_none() {
        let registry = ToolRegistry::with_defaults();
        assert!(registry.get("teleport.player").is_none());
    }
}
