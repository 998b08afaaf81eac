//! Pinecone vector store provider
//!
//! Talks to the data plane of a single index: `/vectors/upsert` for ingestion and
//! `/query` for similarity search. Chunk text is stored in the vector metadata under
//! `text`, next to the provenance fields.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::types::{ChunkMetadata, DocumentChunk};

/// Pinecone index client
pub struct PineconeStore {
    client: Client,
    api_key: String,
    base_url: String,
    index_name: String,
    namespace: Option<String>,
    batch_size: usize,
}

#[derive(serde::Serialize)]
struct Vector {
    id: String,
    values: Vec<f32>,
    metadata: Map<String, Value>,
}

#[derive(serde::Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<Vector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(serde::Deserialize)]
struct Match {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeStore {
    /// Create a client from configuration; fails when the key, index name or host is missing
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        config.validate()?;

        let api_key = config.api_key.clone().unwrap_or_default();
        let host = config.host.clone().unwrap_or_default();
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::vector_db(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!("Using Pinecone index: {}", config.index_name);

        Ok(Self {
            client,
            api_key,
            base_url,
            index_name: config.index_name.clone(),
            namespace: config.namespace.clone(),
            batch_size: config.upsert_batch_size.max(1),
        })
    }

    async fn post<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Pinecone {} failed ({}): {}",
                path, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse Pinecone response: {}", e)))
    }
}

/// Flatten a chunk into Pinecone metadata
fn chunk_to_metadata(chunk: &DocumentChunk) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("text".to_string(), Value::String(chunk.text.clone()));
    metadata.insert(
        "source".to_string(),
        Value::String(chunk.metadata.source.clone()),
    );
    metadata.insert(
        "author".to_string(),
        Value::String(chunk.metadata.author.clone()),
    );
    if let Some(title) = &chunk.metadata.title {
        metadata.insert("title".to_string(), Value::String(title.clone()));
    }
    if let Some(year) = &chunk.metadata.year {
        metadata.insert("year".to_string(), Value::String(year.clone()));
    }
    metadata
}

/// Rebuild a chunk from Pinecone metadata
fn metadata_to_chunk(metadata: &Map<String, Value>) -> DocumentChunk {
    let field = |key: &str| -> Option<String> {
        metadata.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    DocumentChunk {
        text: field("text").unwrap_or_default(),
        metadata: ChunkMetadata {
            source: field("source").unwrap_or_default(),
            author: field("author").unwrap_or_default(),
            title: field("title"),
            year: field("year"),
        },
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn upsert_chunks(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(Error::vector_db(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut upserted = 0;
        let pairs: Vec<_> = chunks.iter().zip(embeddings).collect();
        for batch in pairs.chunks(self.batch_size) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|(chunk, embedding)| Vector {
                        id: chunk.content_id(),
                        values: (*embedding).clone(),
                        metadata: chunk_to_metadata(chunk),
                    })
                    .collect(),
                namespace: self.namespace.as_deref(),
            };

            let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
            upserted += response.upserted_count;
        }

        tracing::info!("Upserted {} vectors into '{}'", upserted, self.index_name);
        Ok(upserted)
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorSearchResult>> {
        let request = QueryRequest {
            vector: query_embedding,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = self.post("/query", &request).await?;

        let mut results: Vec<VectorSearchResult> = response
            .matches
            .into_iter()
            .filter(|m| m.score >= score_threshold)
            .filter_map(|m| {
                m.metadata.map(|metadata| VectorSearchResult {
                    chunk: metadata_to_chunk(&metadata),
                    similarity: m.score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
