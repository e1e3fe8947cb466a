use onair_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    CorruptRecord(#[from] ModelError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
