//! Document ingestion: PDF conversion, semantic chunking and upload

mod chunker;
pub mod content;
mod loader;
pub mod pdf;

pub use chunker::SemanticChunker;
pub use content::{clean_text, extract_core_content};
pub use loader::{ingest_text_file, IngestReport};
pub use pdf::{pdf_to_txt, PdfConversion};
