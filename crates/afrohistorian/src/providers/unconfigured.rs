//! Stand-ins used when a hosted service is missing its configuration
//!
//! The server still starts; every call reports the configuration problem so the
//! caller can turn it into a failure result.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::providers::{LlmProvider, TextStream, VectorSearchResult, VectorStoreProvider};
use crate::types::DocumentChunk;

/// Vector store that only reports why it is unavailable
pub struct UnconfiguredStore {
    reason: String,
}

impl UnconfiguredStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VectorStoreProvider for UnconfiguredStore {
    async fn upsert_chunks(&self, _: &[DocumentChunk], _: &[Vec<f32>]) -> Result<usize> {
        Err(Error::config(self.reason.clone()))
    }

    async fn similarity_search(&self, _: &[f32], _: usize, _: f32) -> Result<Vec<VectorSearchResult>> {
        Err(Error::config(self.reason.clone()))
    }

    fn check_ready(&self) -> Result<()> {
        Err(Error::config(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// LLM that only reports why it is unavailable
pub struct UnconfiguredLlm {
    reason: String,
}

impl UnconfiguredLlm {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for UnconfiguredLlm {
    async fn complete(&self, _: &str) -> Result<String> {
        Err(Error::config(self.reason.clone()))
    }

    async fn stream(&self, _: &str) -> Result<TextStream> {
        Err(Error::config(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }

    fn model(&self) -> &str {
        "none"
    }
}
