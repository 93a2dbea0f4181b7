use serde::{Deserialize, Serialize};

/// Output length bounds handed to the summarization model, in model tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryLength {
    #[serde(rename = "min-length")]
    pub min_length: u32,
    #[serde(rename = "max-length")]
    pub max_length: u32,
}

impl Default for SummaryLength {
    fn default() -> Self {
        Self {
            min_length: 50,
            max_length: 200,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    pub min_length: u32,
    pub max_length: u32,
    pub do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    #[serde(default)]
    pub available_models: Vec<String>,
}

// OpenAI-compatible chat completions contract

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}
