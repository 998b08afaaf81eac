//! Hosted sentence-transformers embeddings through the Hugging Face inference API
//!
//! The feature-extraction pipeline returns one pooled vector per input text.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;

/// Hugging Face embedding provider
pub struct HuggingFaceEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(serde::Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(serde::Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

impl HuggingFaceEmbedder {
    /// Create a new embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(self.endpoint()).json(&FeatureExtractionRequest {
            inputs: texts,
            options: RequestOptions {
                wait_for_model: true,
            },
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed ({}): {}",
                status, body
            )));
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding in response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            all_embeddings.extend(self.request(batch).await?);
        }

        tracing::debug!("Embedded {} texts with {}", texts.len(), self.config.model);
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
