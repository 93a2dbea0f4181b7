use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::PipelineRun;
use crate::reassembler::ChunkFailure;

/// Provenance record for one summarization run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub created_at: String,
    pub generator: String,
    pub source: SourceInfo,
    pub summarizer: String,
    pub max_tokens: usize,
    pub stats: RunStats,
    pub failed_chunks: Vec<FailedChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunStats {
    pub chunk_count: usize,
    pub oversized_chunks: usize,
    pub summarized_chunks: usize,
    pub summary_chars: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailedChunk {
    pub index: usize,
    pub reason: String,
}

impl From<&ChunkFailure> for FailedChunk {
    fn from(failure: &ChunkFailure) -> Self {
        Self {
            index: failure.index,
            reason: failure.reason.clone(),
        }
    }
}

impl RunManifest {
    pub fn new(source: SourceInfo, summarizer: &str, max_tokens: usize, run: &PipelineRun) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339(),
            generator: format!("docdigest v{}", env!("CARGO_PKG_VERSION")),
            source,
            summarizer: summarizer.to_string(),
            max_tokens,
            stats: RunStats {
                chunk_count: run.chunks.len(),
                oversized_chunks: run.chunks.iter().filter(|c| c.metadata.oversized).count(),
                summarized_chunks: run.outcome.succeeded.len(),
                summary_chars: run.outcome.text.chars().count(),
            },
            failed_chunks: run.outcome.failed.iter().map(FailedChunk::from).collect(),
        }
    }

    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "Run manifest written");
        Ok(())
    }
}

impl SourceInfo {
    /// Hash and measure the input file
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let contents = fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&contents);

        Ok(Self {
            path: path.display().to_string(),
            sha256: hex::encode(hasher.finalize()),
            size_bytes: contents.len() as u64,
        })
    }
}
