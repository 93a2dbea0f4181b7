use std::path::PathBuf;
use thiserror::Error;

use crate::chunker::ChunkError;
use crate::docx::DocxError;

/// Failures that end a whole run
#[derive(Debug, Error)]
pub enum DigestError {
    #[error(transparent)]
    Docx(#[from] DocxError),

    #[error("Document has no readable text: {0}")]
    EmptyDocument(PathBuf),

    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkError),

    #[error("Worker task failed: {0}")]
    Worker(String),
}
