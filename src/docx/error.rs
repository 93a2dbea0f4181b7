use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Not a Word document, missing part: {0}")]
    MissingPart(String),

    #[error("Malformed document XML: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
