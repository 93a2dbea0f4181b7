//! Configuration types and loading

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::chunker::DEFAULT_MAX_TOKENS;
use crate::pipeline::{PipelineOptions, RetryPolicy};
use crate::summarizer::SummaryLength;

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".docdigest.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How text is split before summarization
    pub chunking: ChunkingConfig,

    /// Which model produces the per-chunk summaries
    pub summarizer: SummarizerConfig,

    /// Worker pool, timeouts and retries
    pub pipeline: PipelineConfig,

    /// Outline draft/review loop
    pub refine: RefineConfig,

    /// Output document settings
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration with fallback chain: explicit path, then
    /// `./.docdigest.yml`, then defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from {}: {}", local_config.display(), e),
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_yaml::from_str(&content)?;

        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Fail fast on settings that would break a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "chunking.max-tokens must be greater than zero".into(),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Invalid("pipeline.concurrency must be at least 1".into()));
        }
        if self.pipeline.chunk_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.chunk-timeout-ms must be greater than zero".into(),
            ));
        }
        let length = self.summarizer.length;
        if length.min_length > length.max_length {
            return Err(ConfigError::Invalid(format!(
                "summarizer.length.min-length ({}) exceeds max-length ({})",
                length.min_length, length.max_length
            )));
        }
        if self.refine.max_iterations == 0 {
            return Err(ConfigError::Invalid("refine.max-iterations must be at least 1".into()));
        }
        if self.summarizer.backend == Backend::Chat {
            self.validate_chat()?;
        }
        Ok(())
    }

    /// Check the chat model is usable; the refine loop needs it whatever
    /// the summarizer backend
    pub fn validate_chat(&self) -> Result<(), ConfigError> {
        if std::env::var(&self.summarizer.chat.api_key_env).is_err() {
            return Err(ConfigError::Invalid(format!(
                "API key not found. Set the {} environment variable.",
                self.summarizer.chat.api_key_env
            )));
        }
        Ok(())
    }
}

/// Cost oracle used to size chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    /// One unit per whitespace-delimited word
    Words,
    /// Bytes divided by four
    Heuristic,
    /// Model tokenizer on the local model server
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Budget per chunk in oracle units
    #[serde(rename = "max-tokens")]
    pub max_tokens: usize,

    pub oracle: OracleKind,

    /// Local model server providing `/tokenize`
    #[serde(rename = "tokenizer-endpoint")]
    pub tokenizer_endpoint: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            oracle: OracleKind::Heuristic,
            tokenizer_endpoint: "http://localhost:18116".to_string(),
        }
    }
}

/// Summarization backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local transformer summarization server
    Local,
    /// Hosted OpenAI-compatible chat model
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub backend: Backend,

    /// Local summarization server
    pub endpoint: String,

    /// Model requested from the local server; server default when unset
    pub model: Option<String>,

    pub length: SummaryLength,

    /// HTTP timeout for the local server in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    pub chat: ChatConfig,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            endpoint: "http://localhost:18116".to_string(),
            model: None,
            length: SummaryLength::default(),
            timeout_ms: 180_000,
            chat: ChatConfig::default(),
        }
    }
}

/// Hosted chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Upper bound on tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    pub temperature: f32,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chunks summarized at once
    pub concurrency: usize,

    /// Per-attempt timeout for one chunk in milliseconds
    #[serde(rename = "chunk-timeout-ms")]
    pub chunk_timeout_ms: u64,

    /// Extra attempts for retryable summarizer errors
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            chunk_timeout_ms: 180_000,
            max_retries: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl PipelineConfig {
    pub fn options(&self, length: SummaryLength) -> PipelineOptions {
        PipelineOptions {
            concurrency: self.concurrency.max(1),
            chunk_timeout: Duration::from_millis(self.chunk_timeout_ms),
            length,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_delay: Duration::from_millis(self.initial_backoff_ms),
                max_delay: Duration::from_millis(self.max_backoff_ms),
                multiplier: 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// Reviewer phrase that ends the loop, matched case-insensitively
    #[serde(rename = "approval-phrase")]
    pub approval_phrase: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            approval_phrase: "complete and accurate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Heading placed above the summary
    pub heading: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            heading: "Summarized Content".to_string(),
        }
    }
}
