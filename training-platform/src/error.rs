use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("training source directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("training execution error: {0}")]
    TrainingExecution(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for PlatformError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PlatformError::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
