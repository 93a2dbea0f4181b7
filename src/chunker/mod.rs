mod cost;
mod splitter;


pub use cost::{CostOracle, HeuristicOracle, OracleError, RemoteTokenizer, WordCountOracle};
pub use splitter::{Chunk, ChunkError, ChunkMetadata, chunk_text};

/// Default token budget per chunk (the context window of bart-large-cnn)
pub const DEFAULT_MAX_TOKENS: usize = 1024;
