//! Context retrieval for the answer engine

use serde::Serialize;
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorSearchResult, VectorStoreProvider};

/// Outcome of a retrieval attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetrievalStatus {
    Success,
    Error,
}

/// Retrieved passages plus status; failures never escape as errors
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub status: RetrievalStatus,
    pub error: Option<String>,
    pub results: Vec<VectorSearchResult>,
}

impl RetrievalResult {
    fn success(results: Vec<VectorSearchResult>) -> Self {
        Self {
            status: RetrievalStatus::Success,
            error: None,
            results,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            status: RetrievalStatus::Error,
            error: Some(error),
            results: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RetrievalStatus::Success
    }

    /// The passages, or the failure as an error
    pub fn into_results(self) -> Result<Vec<VectorSearchResult>> {
        match self.status {
            RetrievalStatus::Success => Ok(self.results),
            RetrievalStatus::Error => Err(Error::retrieval(self.error.unwrap_or_default())),
        }
    }
}

/// Embeds a query and looks up the nearest passages
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    top_k: usize,
    score_threshold: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k: config.top_k,
            score_threshold: config.score_threshold,
        }
    }

    /// Retrieve the configured number of passages
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        self.retrieve_top(query, self.top_k).await
    }

    /// Retrieve at most `top_k` passages above the similarity threshold
    pub async fn retrieve_top(&self, query: &str, top_k: usize) -> RetrievalResult {
        match self.search(query, top_k).await {
            Ok(results) => {
                tracing::debug!(
                    "Retrieved {} passages from {} (threshold {})",
                    results.len(),
                    self.store.name(),
                    self.score_threshold
                );
                RetrievalResult::success(results)
            }
            Err(e) => {
                tracing::error!("Error retrieving vectors from {}: {}", self.store.name(), e);
                RetrievalResult::failure(e.to_string())
            }
        }
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorSearchResult>> {
        self.store.check_ready()?;
        let embedding = self.embedder.embed(query).await?;
        self.store
            .similarity_search(&embedding, top_k, self.score_threshold)
            .await
    }
}
