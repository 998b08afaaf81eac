//! Loading text files into the vector store

use std::path::Path;

use crate::error::{Error, Result};
use crate::ingestion::SemanticChunker;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::ChunkMetadata;

/// Summary of one ingested file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks produced from the file
    pub chunks: usize,
    /// Vectors the store reported as written
    pub upserted: usize,
}

/// Chunk a `.txt` file, embed the chunks and upsert them.
///
/// `metadata` defaults to [`ChunkMetadata::for_file`] for the given path.
pub async fn ingest_text_file(
    path: &Path,
    metadata: Option<ChunkMetadata>,
    chunker: &SemanticChunker,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStoreProvider,
) -> Result<IngestReport> {
    let name = path.display().to_string();

    if !path.exists() {
        return Err(Error::file_parse(&name, "File not found"));
    }
    if path.extension().and_then(|e| e.to_str()) != Some("txt") {
        return Err(Error::file_parse(&name, "File is not a .txt file"));
    }
    store.check_ready()?;

    let text = tokio::fs::read_to_string(path).await?;
    let metadata = metadata.unwrap_or_else(|| ChunkMetadata::for_file(name.clone()));

    let chunks = chunker.create_documents(&text, &metadata).await;
    if chunks.is_empty() {
        return Err(Error::file_parse(&name, "No chunks created from the text"));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    let expected = embedder.dimensions();
    if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
        return Err(Error::embedding(format!(
            "{} returned {}-dimensional vectors, index expects {}",
            embedder.name(),
            bad.len(),
            expected
        )));
    }
    let upserted = store.upsert_chunks(&chunks, &embeddings).await?;

    tracing::info!("Uploaded {} chunks from {} to {}", chunks.len(), name, store.name());

    Ok(IngestReport {
        chunks: chunks.len(),
        upserted,
    })
}
