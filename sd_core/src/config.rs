//! Orchestrator configuration.
//!
//! One root record aggregating nested sub-configs, mirroring the reference
//! workspace's director-config shape: each sub-config documents its own
//! tuned defaults and offers a `for_testing()` variant with shorter
//! timeouts and smaller token budgets so unit tests stay fast.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LlmBackend {
    Codex,
    Api,
    GeminiCli,
    ClaudeCli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    pub planner_max_tokens: u32,
    pub writer_max_tokens: u32,
    pub extractor_max_tokens: u32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            backend: LlmBackend::Api,
            model: "default".to_string(),
            planner_max_tokens: 800,
            writer_max_tokens: 1600,
            extractor_max_tokens: 800,
            timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    pub fn for_testing() -> Self {
        LlmConfig {
            timeout: Duration::from_millis(200),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tools_per_tick: usize,
    pub recent_scenes_count: usize,
    pub full_text_scenes_count: usize,
    pub summary_scenes_count: usize,
    pub checkpoint_summary_interval: u64,
    pub target_word_count_min: usize,
    pub target_word_count_max: usize,
    pub enable_fact_extraction: bool,
    pub enable_entity_updates: bool,
    pub enable_tension_tracking: bool,
    pub enable_lore_tracking: bool,
    pub use_plot_first: bool,
    pub plot_beats_ahead: usize,
    pub plot_regeneration_threshold: usize,
    pub verify_beat_execution: bool,
    pub allow_beat_skip: bool,
    pub fallback_to_reactive: bool,
    pub use_multi_stage_planner: bool,
    pub save_prompts: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            max_tools_per_tick: 4,
            recent_scenes_count: 3,
            full_text_scenes_count: 2,
            summary_scenes_count: 3,
            checkpoint_summary_interval: 10,
            target_word_count_min: 500,
            target_word_count_max: 900,
            enable_fact_extraction: true,
            enable_entity_updates: true,
            enable_tension_tracking: true,
            enable_lore_tracking: true,
            use_plot_first: false,
            plot_beats_ahead: 5,
            plot_regeneration_threshold: 2,
            verify_beat_execution: true,
            allow_beat_skip: false,
            fallback_to_reactive: true,
            use_multi_stage_planner: true,
            save_prompts: false,
        }
    }
}

impl GenerationConfig {
    pub fn for_testing() -> Self {
        GenerationConfig {
            checkpoint_summary_interval: 2,
            target_word_count_min: 20,
            target_word_count_max: 400,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatMode {
    Off,
    SoftHint,
    Guided,
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    pub beat_mode: BeatMode,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig { beat_mode: BeatMode::Off }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: "info".to_string(), json: false }
    }
}

/// The single configuration record the orchestrator accepts. Missing keys
/// in `config.yaml` take the documented defaults below (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_testing() -> Self {
        OrchestratorConfig {
            llm: LlmConfig::for_testing(),
            generation: GenerationConfig::for_testing(),
            plot: PlotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parse a `config.yaml` document, with any keys it omits taking their
    /// documented defaults rather than failing.
    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}
