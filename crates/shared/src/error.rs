use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Uniform error payload surfaced by every core operation. Pairing it with
/// `Result` guarantees a call yields either data or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
