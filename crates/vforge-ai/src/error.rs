//! AI client error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("API key not configured: {0}")]
    MissingCredentials(String),

    #[error("Provider rate limit hit: {0}")]
    RateLimited(String),

    #[error("Provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Could not read audio file: {0}")]
    Audio(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AiError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("provider returned {}: {}", status, body.trim());
        match status {
            429 => Self::RateLimited(detail),
            401 | 403 => Self::Unauthorized(detail),
            _ => Self::RequestFailed(detail),
        }
    }
}
