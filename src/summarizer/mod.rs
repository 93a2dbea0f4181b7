mod chat;
mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use chat::{ChatClient, summary_prompt};
pub use client::{DEFAULT_LOCAL_MODEL, LocalSummarizer};
pub use error::SummarizerError;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, HealthResponse, SummarizeRequest, SummarizeResponse,
    SummaryLength,
};

/// Maps one chunk of text to one summary.
///
/// Each call is independent; failures are local to the chunk.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Model or backend name, recorded in the run manifest
    fn name(&self) -> &str;

    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String, SummarizerError>;
}

/// One-shot system + user completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user: &str) -> Result<String, SummarizerError>;
}
