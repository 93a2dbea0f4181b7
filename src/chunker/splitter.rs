use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::cost::{CostOracle, OracleError};

/// A contiguous span of the input words, ready for summarization
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    /// Position of this chunk in the chunk sequence
    pub index: usize,
    /// Words of the span joined by single spaces
    pub text: String,
    /// Metadata about the chunk
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    /// Cost reported by the oracle for `text`
    pub cost: usize,
    /// Index of the first word of the span in the input word sequence
    pub start_word: usize,
    /// Number of words in the span
    pub word_count: usize,
    /// A single word whose own cost already reaches the budget
    pub oversized: bool,
}

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Chunk budget must be greater than zero")]
    InvalidBudget,

    #[error("Cost oracle failed at word {word_index}: {source}")]
    Oracle {
        word_index: usize,
        #[source]
        source: OracleError,
    },
}

/// Split `text` into chunks whose cost stays under `max_cost`.
///
/// Words are accumulated greedily. When appending a word makes the buffer
/// reach `max_cost`, the buffer without that word is emitted and the word
/// starts the next chunk. A word that reaches the budget on its own is
/// emitted as a single oversized chunk.
///
/// Oracle failures are fatal: the first error aborts chunking.
pub fn chunk_text(
    text: &str,
    max_cost: usize,
    oracle: &dyn CostOracle,
) -> Result<Vec<Chunk>, ChunkError> {
    if max_cost == 0 {
        return Err(ChunkError::InvalidBudget);
    }

    let mut chunks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut buffer_start = 0;
    let mut buffer_cost = 0;

    for (word_index, word) in text.split_whitespace().enumerate() {
        buffer.push(word);
        let mut cost = measure(oracle, &buffer, word_index)?;

        if cost < max_cost {
            buffer_cost = cost;
            continue;
        }

        if buffer.len() > 1 {
            buffer.pop();
            chunks.push(build_chunk(chunks.len(), &buffer, buffer_start, buffer_cost, false));

            buffer.clear();
            buffer.push(word);
            buffer_start = word_index;

            cost = measure(oracle, &buffer, word_index)?;
            if cost < max_cost {
                buffer_cost = cost;
                continue;
            }
        }

        // The word alone reaches the budget; emit it rather than loop on it
        warn!(
            word_index,
            cost, max_cost, "single word exceeds chunk budget, emitting oversized chunk"
        );
        chunks.push(build_chunk(chunks.len(), &buffer, word_index, cost, true));
        buffer.clear();
        buffer_start = word_index + 1;
        buffer_cost = 0;
    }

    if !buffer.is_empty() {
        chunks.push(build_chunk(chunks.len(), &buffer, buffer_start, buffer_cost, false));
    }

    debug!(chunks = chunks.len(), max_cost, "chunk_text: done");
    Ok(chunks)
}

fn measure(
    oracle: &dyn CostOracle,
    words: &[&str],
    word_index: usize,
) -> Result<usize, ChunkError> {
    oracle
        .cost_of(&words.join(" "))
        .map_err(|source| ChunkError::Oracle { word_index, source })
}

fn build_chunk(
    index: usize,
    words: &[&str],
    start_word: usize,
    cost: usize,
    oversized: bool,
) -> Chunk {
    Chunk {
        index,
        text: words.join(" "),
        metadata: ChunkMetadata {
            cost,
            start_word,
            word_count: words.len(),
            oversized,
        },
    }
}
