//! Provider abstractions for the hosted services the chat service relies on
//!
//! Embeddings, vector storage and answer generation all happen remotely; these
//! traits are the seams that let the engine run against fakes in tests.

pub mod embedding;
pub mod huggingface;
pub mod llm;
pub mod openai;
pub mod pinecone;
pub mod unconfigured;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use huggingface::HuggingFaceEmbedder;
pub use llm::{LlmProvider, TextStream};
pub use openai::OpenAiChat;
pub use pinecone::PineconeStore;
pub use unconfigured::{UnconfiguredLlm, UnconfiguredStore};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;

/// The hosted services one configuration points at
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

impl Providers {
    /// Build the hosted providers.
    ///
    /// A vector store or LLM lacking credentials is replaced by a stand-in that
    /// reports the problem on every call.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(HuggingFaceEmbedder::new(&config.embeddings)?);

        let vector_store: Arc<dyn VectorStoreProvider> = match PineconeStore::new(&config.vector_db) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!("Vector store unavailable: {}", e);
                Arc::new(UnconfiguredStore::new(e.to_string()))
            }
        };

        let llm: Arc<dyn LlmProvider> = match OpenAiChat::new(&config.llm) {
            Ok(llm) => Arc::new(llm),
            Err(e) => {
                tracing::warn!("LLM unavailable: {}", e);
                Arc::new(UnconfiguredLlm::new(e.to_string()))
            }
        };

        tracing::info!(
            "Providers ready (embedding: {}, vector store: {}, llm: {} / {})",
            embedder.name(),
            vector_store.name(),
            llm.name(),
            llm.model()
        );

        Ok(Self {
            embedder,
            vector_store,
            llm,
        })
    }
}
