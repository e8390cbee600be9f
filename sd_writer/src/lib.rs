//! Scene Writer, deterministic Evaluator, Tension evaluator, and optional
//! QA (§4.6, §4.7).

pub mod errors;
pub mod evaluator;
pub mod qa;
pub mod scene;
pub mod tension;

pub use errors::{EvaluationError, WriterError};
pub use evaluator::{check_pov, check_word_count};
pub use qa::{BeatHintAlignment, QaEvaluator, QaRecord};
pub use scene::{parse_scene_response, render_writer_prompt, SceneWriter, WrittenScene};
pub use tension::{score_tension, TensionInputs, TensionScore};
