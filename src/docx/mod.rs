//! Word (.docx) text extraction and summary output

mod error;
mod reader;
mod writer;


pub use error::DocxError;
pub use reader::{
    DOCUMENT_PART, extract_paragraphs, extract_text, parse_document_xml, read_paragraphs,
};
pub use writer::{write_summary, write_to};
