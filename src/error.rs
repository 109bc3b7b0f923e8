use thiserror::Error;
use uuid::Uuid;

/// Engine error taxonomy. Validation failures are rejected before any
/// write; store failures carry the underlying cause.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("issue not found: {0}")]
    NotFound(Uuid),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(err.into())
    }
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}
