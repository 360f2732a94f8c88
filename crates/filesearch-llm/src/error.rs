use std::fmt;

use filesearch::ExtractionError;

#[derive(Debug, Clone)]
pub enum LlmError {
    InvalidInput(String),
    Internal(String),
    Http(String),
    Status { code: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            LlmError::Internal(msg) => write!(f, "internal error: {msg}"),
            LlmError::Http(msg) => write!(f, "request failed: {msg}"),
            LlmError::Status { code, body } => write!(f, "server returned {code}: {body}"),
            LlmError::InvalidResponse(msg) => write!(f, "invalid completion response: {msg}"),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        LlmError::Http(error.to_string())
    }
}

impl From<LlmError> for ExtractionError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::InvalidResponse(msg) => ExtractionError::Malformed(msg),
            other => ExtractionError::Backend(other.to_string()),
        }
    }
}
