//! In-process fake providers for unit tests

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{
    EmbeddingProvider, LlmProvider, TextStream, VectorSearchResult, VectorStoreProvider,
};
use crate::types::{ChunkMetadata, DocumentChunk};

type EmbedFn = dyn Fn(&str) -> Vec<f32> + Send + Sync;

pub struct FakeEmbedder {
    embed_fn: Box<EmbedFn>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn constant() -> Self {
        Self::with(|_| vec![1.0, 0.0, 0.0])
    }

    pub fn with(f: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            embed_fn: Box::new(f),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::constant()
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::embedding("embedding service unavailable"));
        }
        Ok((self.embed_fn)(text))
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
pub struct FakeStore {
    results: Vec<VectorSearchResult>,
    fail: bool,
    pub searches: AtomicUsize,
    pub upserted: Mutex<Vec<DocumentChunk>>,
}

impl FakeStore {
    pub fn with_passages(passages: &[(&str, f32)]) -> Self {
        Self {
            results: passages
                .iter()
                .map(|(text, score)| VectorSearchResult {
                    chunk: DocumentChunk::new(*text, ChunkMetadata::default()),
                    similarity: *score,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorStoreProvider for FakeStore {
    async fn upsert_chunks(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        if self.fail {
            return Err(Error::vector_db("connection refused"));
        }
        assert_eq!(chunks.len(), embeddings.len());
        self.upserted.lock().extend_from_slice(chunks);
        Ok(chunks.len())
    }

    async fn similarity_search(
        &self,
        _query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorSearchResult>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::vector_db("connection refused"));
        }
        Ok(self
            .results
            .iter()
            .filter(|r| r.similarity >= score_threshold)
            .take(top_k)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// How a fake completion behaves
#[derive(Clone)]
pub enum LlmScript {
    /// Produce these increments and finish
    Chunks(Vec<String>),
    /// Produce these increments, then fail mid-stream
    FailAfter(Vec<String>),
    /// Produce these increments, then never finish
    HangAfter(Vec<String>),
    /// Reject the request before producing anything
    Reject,
}

pub struct FakeLlm {
    script: LlmScript,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    /// Set when a produced stream has been dropped by its consumer
    pub dropped: Arc<AtomicUsize>,
}

impl FakeLlm {
    pub fn new(script: LlmScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Self::new(LlmScript::Chunks(chunks.iter().map(|c| c.to_string()).collect()))
    }

    fn record(&self, prompt: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
    }
}

struct DropFlag(Arc<AtomicUsize>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.record(prompt);
        match &self.script {
            LlmScript::Chunks(chunks) => Ok(chunks.concat()),
            _ => Err(Error::llm("model overloaded")),
        }
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        self.record(prompt);
        let flag = DropFlag(Arc::clone(&self.dropped));
        let ok = |chunks: &Vec<String>| stream::iter(chunks.clone().into_iter().map(Ok::<String, Error>));

        let inner: TextStream = match &self.script {
            LlmScript::Chunks(chunks) => ok(chunks).boxed(),
            LlmScript::FailAfter(chunks) => ok(chunks)
                .chain(stream::once(async { Err(Error::llm("connection reset")) }))
                .boxed(),
            LlmScript::HangAfter(chunks) => ok(chunks).chain(stream::pending()).boxed(),
            LlmScript::Reject => return Err(Error::llm("model overloaded")),
        };

        Ok(inner
            .map(move |item| {
                let _keep = &flag;
                item
            })
            .boxed())
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}
