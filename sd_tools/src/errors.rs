//! Tool-layer error taxonomy (§4.3, §7 `ToolError`/`InputError`).

use sd_core::errors::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArgs { tool: String, reason: String },

    #[error("{tool} failed: {0}", tool = .tool)]
    Failed { tool: String, source: StoreError },
}

impl ToolError {
    pub fn failed(tool: impl Into<String>, source: StoreError) -> Self {
        ToolError::Failed { tool: tool.into(), source }
    }

    pub fn invalid(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgs { tool: tool.into(), reason: reason.into() }
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;
