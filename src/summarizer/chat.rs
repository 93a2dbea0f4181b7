//! OpenAI-compatible chat completions client
//!
//! Used both as a hosted [`Summarizer`] and as the [`ChatModel`] behind the
//! outline refine loop.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::error::SummarizerError;
use super::types::{ChatMessage, ChatRequest, ChatResponse, SummaryLength};
use super::{ChatModel, Summarizer};
use crate::config::ChatConfig;

const SUMMARY_SYSTEM_PROMPT: &str = "\
You are an expert summarization assistant. Analyze the provided content, distill \
the main points and produce a concise, structured summary. Favor readability and \
simplify complex ideas for a professional audience.";

/// Hosted chat model client
pub struct ChatClient {
    http: Client,
    model: String,
    base_url: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatClient {
    /// Build a client from configuration, reading the API key from the
    /// configured environment variable
    pub fn from_config(config: &ChatConfig) -> Result<Self, SummarizerError> {
        debug!(
            model = %config.model,
            base_url = %config.base_url,
            "ChatClient::from_config: called"
        );
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| SummarizerError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &ChatConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, SummarizerError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn build_request(&self, system_prompt: &str, user: &str, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user)],
            max_tokens: max_tokens.min(self.max_tokens),
            temperature: self.temperature,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, SummarizerError> {
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
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

        let res: ChatResponse = response.json().await?;
        let content = res
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(SummarizerError::EmptyResponse);
        }
        Ok(content)
    }
}

/// User prompt asking for the structured summary of one chunk
pub fn summary_prompt(content: &str, length: SummaryLength) -> String {
    format!(
        "Content to analyze:\n{content}\n\n\
         Keep the summary between {min} and {max} words.\n\
         Output the summary in this format:\n\
         - Main Topics: [List key themes]\n\
         - Summary: [Provide a concise summary]\n\
         - Insights: [Include actionable insights, if applicable]",
        min = length.min_length,
        max = length.max_length,
    )
}

#[async_trait]
impl Summarizer for ChatClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        debug!(model = %self.model, text_len = text.len(), "ChatClient::summarize: called");
        // Words run longer than tokens; leave headroom for the format markers
        let budget = length.max_length.saturating_mul(2);
        let request =
            self.build_request(SUMMARY_SYSTEM_PROMPT, &summary_prompt(text, length), budget);
        self.send(&request).await
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, system_prompt: &str, user: &str) -> Result<String, SummarizerError> {
        debug!(model = %self.model, user_len = user.len(), "ChatClient::complete: called");
        let request = self.build_request(system_prompt, user, self.max_tokens);
        self.send(&request).await
    }
}
