// Public API exports
pub mod chunker;
pub mod config;
pub mod docx;
pub mod error;
pub mod pipeline;
pub mod reassembler;
pub mod refine;
pub mod report;
pub mod summarizer;

// Re-export main types for convenience
pub use chunker::{
    Chunk, ChunkError, ChunkMetadata, CostOracle, DEFAULT_MAX_TOKENS, HeuristicOracle, OracleError,
    RemoteTokenizer, WordCountOracle, chunk_text,
};

pub use config::{Backend, Config, ConfigError, OracleKind};

pub use docx::DocxError;

pub use error::DigestError;

pub use pipeline::{Pipeline, PipelineOptions, PipelineRun, RetryPolicy, summarize_chunks};

pub use reassembler::{ChunkFailure, ChunkOutcome, SummaryOutcome, reassemble};

pub use refine::{RefineError, RefineLoop, RefineResult};

pub use report::RunManifest;

pub use summarizer::{
    ChatClient, ChatModel, LocalSummarizer, Summarizer, SummarizerError, SummaryLength,
};
