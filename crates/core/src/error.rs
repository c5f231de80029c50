use thiserror::Error;

/// Domain error types shared by the gateway
#[derive(Debug, Error)]
pub enum EmrError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedResource(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EmrResult<T> = Result<T, EmrError>;
