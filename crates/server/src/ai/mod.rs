//! AI assist backed by a pluggable LLM provider

pub mod anthropic;
pub mod assist;
pub mod json;
pub mod openai;
mod provider;

pub use provider::LlmProvider;

use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0}")]
    Unsupported(String),

    #[error("{vendor} API error ({status}): {message}")]
    Api {
        vendor: &'static str,
        status: u16,
        message: String,
    },

    #[error("{0}")]
    Transport(String),

    /// The model answered but not in the expected shape
    #[error("{0}")]
    InvalidResponse(String),
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Unsupported(msg) => AppError::BadRequest(msg),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}
