//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::DocumentChunk;

/// Search result from vector store
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: DocumentChunk,
    /// Similarity score (higher is more similar)
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PineconeStore`: hosted Pinecone index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Upsert chunks with their embeddings (same order, same length).
    ///
    /// Returns the number of vectors written.
    async fn upsert_chunks(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>])
        -> Result<usize>;

    /// Return at most `top_k` chunks whose similarity is at least `score_threshold`,
    /// most similar first
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorSearchResult>>;

    /// Report a configuration problem before any request is made
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
