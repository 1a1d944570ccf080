use thiserror::Error;

/// Errors surfaced by the deduplication engine.
///
/// Stage services propagate these to the caller; only the orchestrator in
/// [`crate::pipeline`] is allowed to swallow them (fail-open policy).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DedupError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl DedupError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
