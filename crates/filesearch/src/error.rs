use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Type hierarchy error: {0}")]
    Hierarchy(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Failures of an extraction backend.
///
/// These never reach the caller of a search: the extractor logs them and
/// degrades to a keyword-only query.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed extraction output: {0}")]
    Malformed(String),

    #[error("extraction output violates schema: {0}")]
    SchemaViolation(String),

    #[error("extraction backend failed: {0}")]
    Backend(String),
}
