//! Project directory layout (§6 External Interfaces).

use sd_core::ids::{CharacterId, FactionId, LocationId, LoreId, SceneId};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectPaths { root: root.into() }
    }

    pub fn state(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn counters(&self) -> PathBuf {
        self.root.join("counters.json")
    }

    pub fn lock(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.root.join("memory")
    }

    pub fn character(&self, id: CharacterId) -> PathBuf {
        self.memory_dir().join("characters").join(format!("{id}.json"))
    }

    pub fn characters_dir(&self) -> PathBuf {
        self.memory_dir().join("characters")
    }

    pub fn location(&self, id: LocationId) -> PathBuf {
        self.memory_dir().join("locations").join(format!("{id}.json"))
    }

    pub fn locations_dir(&self) -> PathBuf {
        self.memory_dir().join("locations")
    }

    pub fn scene_record(&self, id: SceneId) -> PathBuf {
        self.memory_dir().join("scenes").join(format!("{id}.json"))
    }

    pub fn scenes_dir(&self) -> PathBuf {
        self.memory_dir().join("scenes")
    }

    pub fn open_loops(&self) -> PathBuf {
        self.memory_dir().join("open_loops.json")
    }

    pub fn relationships(&self) -> PathBuf {
        self.memory_dir().join("relationships.json")
    }

    pub fn faction(&self, id: FactionId) -> PathBuf {
        self.memory_dir().join("factions").join(format!("{id}.json"))
    }

    pub fn factions_dir(&self) -> PathBuf {
        self.memory_dir().join("factions")
    }

    pub fn lore(&self, id: LoreId) -> PathBuf {
        self.memory_dir().join("lore").join(format!("{id}.json"))
    }

    pub fn lore_dir(&self) -> PathBuf {
        self.memory_dir().join("lore")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.memory_dir().join("index")
    }

    pub fn scene_markdown(&self, id: SceneId) -> PathBuf {
        self.root.join("scenes").join(format!("scene_{:03}.md", id.0))
    }

    /// QA record for a scene, written next to its markdown file and read
    /// back as the following tick's `qa_feedback` planner input (§4.7).
    pub fn scene_qa(&self, id: SceneId) -> PathBuf {
        self.root.join("scenes").join(format!("scene_{:03}.qa.json", id.0))
    }

    pub fn plan(&self, tick: u64) -> PathBuf {
        self.root.join("plans").join(format!("plan_{tick:03}.json"))
    }

    pub fn plot_outline(&self) -> PathBuf {
        self.root.join("plot_outline.json")
    }

    pub fn error_json(&self, tick: u64) -> PathBuf {
        self.root.join("errors").join(format!("error_{tick:03}.json"))
    }

    pub fn error_log(&self, tick: u64) -> PathBuf {
        self.root.join("errors").join(format!("error_{tick:03}.log"))
    }

    pub fn checkpoint_dir(&self, tick: u64) -> PathBuf {
        self.root.join("checkpoints").join(format!("checkpoint_tick_{tick:03}"))
    }

    pub fn checkpoint_manifest(&self, tick: u64) -> PathBuf {
        self.checkpoint_dir(tick).join("checkpoint.bin")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }
}
