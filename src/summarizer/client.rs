use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::error::SummarizerError;
use super::types::{HealthResponse, SummarizeRequest, SummarizeResponse, SummaryLength};
use super::Summarizer;

/// Default model served by the local summarization server
pub const DEFAULT_LOCAL_MODEL: &str = "facebook/bart-large-cnn";

/// Client for a local transformer summarization server.
///
/// The server exposes `POST /summarize` (one text in, one summary out)
/// and `GET /health`.
pub struct LocalSummarizer {
    http: Client,
    endpoint: String,
    model: Option<String>,
}

impl LocalSummarizer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SummarizerError> {
        Self::with_timeout(endpoint, Duration::from_secs(180))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SummarizerError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: None,
        })
    }

    /// Request a specific model instead of the server's loaded default
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Check if the summarizer server is healthy
    pub async fn health_check(&self) -> Result<HealthResponse, SummarizerError> {
        let response = self
            .http
            .get(format!("{}/health", self.endpoint))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SummarizerError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    fn build_request(&self, text: &str, length: SummaryLength) -> SummarizeRequest {
        SummarizeRequest {
            text: text.to_string(),
            min_length: length.min_length,
            max_length: length.max_length,
            do_sample: false,
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl Summarizer for LocalSummarizer {
    fn name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_LOCAL_MODEL)
    }

    async fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        debug!(text_len = text.len(), ?length, "LocalSummarizer::summarize: called");
        let req = self.build_request(text, length);

        let response = self
            .http
            .post(format!("{}/summarize", self.endpoint))
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SummarizerError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let res: SummarizeResponse = response.json().await?;
        let summary = res.summary.trim();
        if summary.is_empty() {
            return Err(SummarizerError::EmptyResponse);
        }
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_length_bounds() {
        let client = LocalSummarizer::new("http://localhost:18116").unwrap();
        let req = client.build_request(
            "some text",
            SummaryLength {
                min_length: 10,
                max_length: 40,
            },
        );

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["text"], "some text");
        assert_eq!(json["min_length"], 10);
        assert_eq!(json["max_length"], 40);
        assert_eq!(json["do_sample"], false);
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_model_override() {
        let client = LocalSummarizer::new("http://localhost:18116")
            .unwrap()
            .with_model("sshleifer/distilbart-cnn-12-6");
        assert_eq!(client.name(), "sshleifer/distilbart-cnn-12-6");

        let req = client.build_request("x", SummaryLength::default());
        assert_eq!(req.model.as_deref(), Some("sshleifer/distilbart-cnn-12-6"));
    }

    #[test]
    fn test_default_name() {
        let client = LocalSummarizer::new("http://localhost:18116").unwrap();
        assert_eq!(client.name(), DEFAULT_LOCAL_MODEL);
    }

    // Integration test - requires the model server running
    #[tokio::test]
    #[ignore]
    async fn test_summarize_round_trip() {
        let client = LocalSummarizer::new("http://localhost:18116").unwrap();
        let health = client.health_check().await.unwrap();
        assert_eq!(health.status, "ok");

        let text = "The committee met on Tuesday to review the design specification. ".repeat(20);
        let summary = client.summarize(&text, SummaryLength::default()).await.unwrap();
        assert!(!summary.is_empty());
    }
}
