//! Document chunks stored in the vector database

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Provenance attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Where the text came from (file path, "textbook", ...)
    pub source: String,
    /// Author(s)
    pub author: String,
    /// Title of the work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Publication year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self {
            source: "textbook".to_string(),
            author: "TOAA".to_string(),
            title: None,
            year: None,
        }
    }
}

impl ChunkMetadata {
    /// Metadata for a text file ingested from disk
    pub fn for_file(path: impl Into<String>) -> Self {
        Self {
            source: path.into(),
            author: "Multiple".to_string(),
            title: Some("West African History".to_string()),
            year: Some("2018".to_string()),
        }
    }
}

/// A passage of text with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Passage text
    pub text: String,
    /// Provenance
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Stable identifier derived from source and text, so re-ingesting a file
    /// overwrites its vectors instead of duplicating them
    pub fn content_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.metadata.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}
