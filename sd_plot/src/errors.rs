//! Error taxonomy for the Plot Outline Manager (§4.9).

use sd_core::errors::StoreError;
use sd_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum BeatGenerationError {
    #[error("beat generator llm call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("beat generator output did not parse as the expected schema: {0}")]
    Parse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One validation failure for a beat submitted to `add_beats` (§4.9).
/// `add_beats` collects every defect into a `Vec` rather than stopping at
/// the first one, mirroring the reference workspace's storylet validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeatValidationError {
    EmptyDescription { index: usize },
    UnknownPrerequisite { index: usize, prerequisite: String },
    InvalidTensionTarget { index: usize, value: u8 },
    DuplicateDescription { index: usize, description: String },
    /// The outline could not be loaded or persisted; carries the
    /// underlying store error's rendered message since `StoreError`
    /// doesn't implement `PartialEq`/`Clone`.
    Store(String),
}

impl std::fmt::Display for BeatValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription { index } => {
                write!(f, "beat at batch index {index} has an empty description")
            }
            Self::UnknownPrerequisite { index, prerequisite } => {
                write!(f, "beat at batch index {index} references unknown prerequisite '{prerequisite}'")
            }
            Self::InvalidTensionTarget { index, value } => {
                write!(f, "beat at batch index {index} has tension_target {value} outside 0..=10")
            }
            Self::DuplicateDescription { index, description } => {
                write!(f, "beat at batch index {index} duplicates an existing beat's description: '{description}'")
            }
            Self::Store(message) => write!(f, "plot outline store error: {message}"),
        }
    }
}

impl std::error::Error for BeatValidationError {}

impl From<StoreError> for BeatValidationError {
    fn from(err: StoreError) -> Self {
        BeatValidationError::Store(err.to_string())
    }
}
