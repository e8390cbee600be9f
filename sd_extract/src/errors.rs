//! Error taxonomy for the Extractor half of §4.8. The Updater half never
//! fails the tick (§4.8, §7's "Entity Updater ... degrade gracefully"); it
//! only ever returns warnings alongside a successful `UpdateStats`.

use sd_core::errors::StoreError;
use sd_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum FactExtractionError {
    #[error("extractor llm call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("extractor output did not parse as the expected schema: {0}")]
    Parse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
