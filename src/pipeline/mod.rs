//! Chunk, summarize and reassemble.
//!
//! Chunks are summarized as independent tasks on a bounded worker pool and
//! collected by chunk index, so the final text is the same whatever order
//! the tasks finish in.

mod retry;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, CostOracle, chunk_text};
use crate::docx;
use crate::error::DigestError;
use crate::reassembler::{ChunkOutcome, SummaryOutcome, reassemble};
use crate::summarizer::{Summarizer, SummarizerError, SummaryLength};

pub use retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum chunks summarized at once
    pub concurrency: usize,
    /// Per-attempt timeout for one chunk
    pub chunk_timeout: Duration,
    pub length: SummaryLength,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            chunk_timeout: Duration::from_secs(180),
            length: SummaryLength::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Chunks and their reassembled summary
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub chunks: Vec<Chunk>,
    pub outcome: SummaryOutcome,
}

/// Owns the cost oracle and summarizer for the lifetime of the caller
pub struct Pipeline {
    oracle: Arc<dyn CostOracle>,
    summarizer: Arc<dyn Summarizer>,
    max_cost: usize,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        oracle: Arc<dyn CostOracle>,
        summarizer: Arc<dyn Summarizer>,
        max_cost: usize,
    ) -> Self {
        Self {
            oracle,
            summarizer,
            max_cost,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn summarizer_name(&self) -> &str {
        self.summarizer.name()
    }

    /// Split `text` on a blocking thread; oracles may block on I/O
    pub async fn chunk(&self, text: &str) -> Result<Vec<Chunk>, DigestError> {
        let oracle = Arc::clone(&self.oracle);
        let text = text.to_string();
        let max_cost = self.max_cost;

        let task =
            tokio::task::spawn_blocking(move || chunk_text(&text, max_cost, oracle.as_ref()));
        let chunks = task.await.map_err(|e| DigestError::Worker(e.to_string()))??;
        Ok(chunks)
    }

    pub async fn run(&self, text: &str) -> Result<PipelineRun, DigestError> {
        let chunks = self.chunk(text).await?;
        info!(chunks = chunks.len(), max_cost = self.max_cost, "Chunking complete");

        let outcomes = summarize_chunks(&chunks, Arc::clone(&self.summarizer), &self.options).await;
        let outcome = reassemble(&outcomes);

        if outcome.failed.is_empty() {
            info!(chunks = chunks.len(), "Summarization complete");
        } else {
            warn!(
                failed = outcome.failed.len(),
                total = chunks.len(),
                "Summarization complete with failed chunks"
            );
        }

        Ok(PipelineRun { chunks, outcome })
    }

    /// Extract a .docx and summarize its text
    pub async fn run_document(&self, path: &Path) -> Result<PipelineRun, DigestError> {
        let text = docx::extract_text(path)?;
        if text.is_empty() {
            return Err(DigestError::EmptyDocument(path.to_path_buf()));
        }
        info!(path = %path.display(), bytes = text.len(), "Document content extracted");
        self.run(&text).await
    }
}

/// Summarize every chunk on a pool of `options.concurrency` workers.
///
/// Returns one outcome per chunk, sorted by chunk index. A chunk that fails,
/// times out or whose task panics yields a failed outcome; other chunks are
/// unaffected.
pub async fn summarize_chunks(
    chunks: &[Chunk],
    summarizer: Arc<dyn Summarizer>,
    options: &PipelineOptions,
) -> Vec<ChunkOutcome> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut js: JoinSet<ChunkOutcome> = JoinSet::new();
    let mut pending: BTreeSet<usize> = BTreeSet::new();

    for chunk in chunks {
        let summarizer = Arc::clone(&summarizer);
        let permits = Arc::clone(&permits);
        let options = options.clone();
        let index = chunk.index;
        let text = chunk.text.clone();

        pending.insert(index);
        js.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return ChunkOutcome::failure(index, "worker pool closed"),
            };
            summarize_chunk(summarizer.as_ref(), index, &text, &options).await
        });
    }

    let mut outcomes = Vec::with_capacity(chunks.len());
    while let Some(joined) = js.join_next().await {
        match joined {
            Ok(outcome) => {
                pending.remove(&outcome.index);
                outcomes.push(outcome);
            }
            Err(e) => warn!("summarization task failed: {}", e),
        }
    }

    // Whatever never reported back panicked or was cancelled
    for index in pending {
        outcomes.push(ChunkOutcome::failure(index, "summarization task aborted"));
    }

    outcomes.sort_by_key(|o| o.index);
    outcomes
}

async fn summarize_chunk(
    summarizer: &dyn Summarizer,
    index: usize,
    text: &str,
    options: &PipelineOptions,
) -> ChunkOutcome {
    let mut attempt = 0;
    loop {
        let call = summarizer.summarize(text, options.length);
        let result = match tokio::time::timeout(options.chunk_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SummarizerError::Timeout(options.chunk_timeout)),
        };

        match result {
            Ok(summary) => {
                debug!(index, attempt, summary_len = summary.len(), "chunk summarized");
                return ChunkOutcome::success(index, summary);
            }
            Err(e) if e.is_retryable() && attempt < options.retry.max_retries => {
                let delay = options.retry.delay_for_attempt(attempt);
                warn!(index, attempt, ?delay, error = %e, "retrying chunk after transient error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(index, error = %e, "Error summarizing chunk, skipping");
                return ChunkOutcome::failure(index, e.to_string());
            }
        }
    }
}
