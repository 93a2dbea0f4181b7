use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Tokenizer server returned error status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Remote tokenizer needs a tokio runtime: {0}")]
    NoRuntime(String),
}

/// Measures the size of a candidate string in the summarization model's units.
///
/// Implementations must be monotone under appends: adding a word to a string
/// never lowers its cost.
pub trait CostOracle: Send + Sync {
    fn cost_of(&self, text: &str) -> Result<usize, OracleError>;
}

/// Counts whitespace-delimited words
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountOracle;

impl CostOracle for WordCountOracle {
    fn cost_of(&self, text: &str) -> Result<usize, OracleError> {
        Ok(text.split_whitespace().count())
    }
}

/// Estimates tokens from byte length.
///
/// Roughly 4 bytes per token for English text. Non-empty text costs at least 1.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicOracle {
    pub bytes_per_token: usize,
}

impl HeuristicOracle {
    pub fn new(bytes_per_token: usize) -> Self {
        Self {
            bytes_per_token: bytes_per_token.max(1),
        }
    }
}

impl Default for HeuristicOracle {
    fn default() -> Self {
        Self::new(4)
    }
}

impl CostOracle for HeuristicOracle {
    fn cost_of(&self, text: &str) -> Result<usize, OracleError> {
        if text.is_empty() {
            return Ok(0);
        }
        Ok(text.len().div_ceil(self.bytes_per_token).max(1))
    }
}

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    count: usize,
}

/// Asks the local model server to tokenize with the model's own vocabulary.
///
/// `cost_of` blocks on the runtime captured at construction, so it must be
/// called from a blocking thread (`spawn_blocking`), never from async code.
pub struct RemoteTokenizer {
    http: Client,
    endpoint: String,
    runtime: Handle,
}

impl RemoteTokenizer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, OracleError> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let runtime = Handle::try_current().map_err(|e| OracleError::NoRuntime(e.to_string()))?;
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            runtime,
        })
    }

    async fn count(&self, text: &str) -> Result<usize, OracleError> {
        let response = self
            .http
            .post(format!("{}/tokenize", self.endpoint))
            .json(&TokenizeRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OracleError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let res: TokenizeResponse = response.json().await?;
        Ok(res.count)
    }
}

impl CostOracle for RemoteTokenizer {
    fn cost_of(&self, text: &str) -> Result<usize, OracleError> {
        debug!(text_len = text.len(), "RemoteTokenizer::cost_of: called");
        self.runtime.block_on(self.count(text))
    }
}
