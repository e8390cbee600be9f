//! Scene Writer / Evaluator error taxonomy (§4.6, §4.7, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("llm call failed: {0}")]
    Llm(#[from] sd_llm::LlmError),
    #[error("could not parse writer output: {0}")]
    Parse(String),
}

/// A fatal band failure (§4.7): "Critical failures ... raise
/// SceneEvaluationFailed which halts the tick."
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("word count {actual} outside target range {min}-{max}")]
    WordCount { actual: usize, min: usize, max: usize },
    #[error("pov violation: {0}")]
    PovViolation(String),
}
