//! Configuration for the chat service
//!
//! Values come from built-in defaults, an optional TOML file and finally the
//! process environment (a `.env` file is honoured through `dotenvy`).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Assistant persona used in prompts and UX messages
    pub assistant: AssistantConfig,
    /// Hosted embedding model configuration
    pub embeddings: EmbeddingConfig,
    /// Hosted LLM configuration
    pub llm: LlmConfig,
    /// Hosted vector database configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval parameters
    pub retrieval: RetrievalConfig,
    /// Semantic chunking parameters
    pub chunking: ChunkingConfig,
    /// Streaming relay parameters
    pub streaming: StreamingConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    ///
    /// The file path is taken from `AFRO_CONFIG` when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("AFRO_CONFIG").ok().map(Into::into));

        let mut config = match file {
            Some(file) => {
                let content = std::fs::read_to_string(&file)?;
                toml::from_str(&content).map_err(|e| {
                    Error::config(format!("Invalid config file {}: {}", file.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Overlay environment variables on top of the current values
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()));
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.llm.model = model;
        }

        if let Some(key) = var("PINECONE_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Some(index) = var("PINECONE_INDEX_NAME") {
            self.vector_db.index_name = index;
        }
        if let Some(host) = var("PINECONE_HOST") {
            self.vector_db.host = Some(host);
        }
        if let Some(namespace) = var("PINECONE_NAMESPACE") {
            self.vector_db.namespace = Some(namespace);
        }

        if let Some(key) = var("HF_API_KEY").or_else(|| var("HUGGINGFACEHUB_API_TOKEN")) {
            self.embeddings.api_key = Some(key);
        }
        if let Some(url) = var("HF_EMBEDDING_URL") {
            self.embeddings.base_url = url;
        }
    }

    /// Server bind address
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Origins allowed by CORS (credentials are allowed for these)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Assistant persona
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Display name, also used in the typing indicator
    pub name: String,
    /// Subject the assistant specializes in
    pub domain: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Afrohistorian".to_string(),
            domain: "African history".to_string(),
        }
    }
}

/// Hosted embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Inference endpoint base URL; the model name is appended
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// API token for the inference endpoint
    pub api_key: Option<String>,
    /// Embedding dimensions (768 for all-mpnet-base-v2)
    pub dimensions: usize,
    /// Texts per embedding request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/pipeline/feature-extraction"
                .to_string(),
            model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            api_key: None,
            dimensions: 768,
            batch_size: 32,
            timeout_secs: 60,
        }
    }
}

/// Hosted LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat completions API base URL
    pub base_url: String,
    /// API key
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed non-streaming requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Hosted vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// API key
    pub api_key: Option<String>,
    /// Index name
    pub index_name: String,
    /// Index host (e.g. `afrohistorian-abc123.svc.us-east1-gcp.pinecone.io`)
    pub host: Option<String>,
    /// Namespace within the index
    pub namespace: Option<String>,
    /// Vectors per upsert request
    pub upsert_batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: "afrohistorian".to_string(),
            host: None,
            namespace: None,
            upsert_batch_size: 100,
            timeout_secs: 30,
        }
    }
}

impl VectorDbConfig {
    /// Check that everything needed to reach the index is present
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
            || self.index_name.trim().is_empty()
        {
            return Err(Error::config(
                "Pinecone API key or index name not found in environment variables.",
            ));
        }
        if self.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
            return Err(Error::config(format!(
                "Pinecone host for index '{}' not found in environment variables.",
                self.index_name
            )));
        }
        Ok(())
    }
}

/// Retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages to retrieve
    pub top_k: usize,
    /// Minimum similarity score for a passage to be used
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.6,
        }
    }
}

/// Semantic chunking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Distances above this percentile become chunk boundaries
    pub breakpoint_percentile: f32,
    /// Neighbouring sentences combined on each side before embedding
    pub buffer_size: usize,
    /// Chunks shorter than this are merged into the previous chunk
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            breakpoint_percentile: 95.0,
            buffer_size: 1,
            min_chunk_chars: 0,
        }
    }
}

/// Streaming relay parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Pause between relayed stream chunks in milliseconds
    pub chunk_delay_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { chunk_delay_ms: 50 }
    }
}
