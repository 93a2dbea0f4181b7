use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Server returned error status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Model returned an empty summary")]
    EmptyResponse,

    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),
}

impl SummarizerError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SummarizerError::RequestFailed(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SummarizerError::ServerError { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            SummarizerError::Timeout(_) => true,
            SummarizerError::EmptyResponse => false,
            SummarizerError::MissingApiKey(_) => false,
        }
    }
}
