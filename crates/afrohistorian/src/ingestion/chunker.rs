//! Semantic chunking: split where neighbouring sentences stop being similar

use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{ChunkMetadata, DocumentChunk};

/// Splits text at large jumps in embedding distance between adjacent sentences
pub struct SemanticChunker {
    embedder: Arc<dyn EmbeddingProvider>,
    /// Distances above this percentile become chunk boundaries
    breakpoint_percentile: f32,
    /// Sentences combined on each side before embedding
    buffer_size: usize,
    /// Shorter chunks are not closed at a boundary
    min_chunk_chars: usize,
}

impl SemanticChunker {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: &ChunkingConfig) -> Self {
        Self {
            embedder,
            breakpoint_percentile: config.breakpoint_percentile.clamp(0.0, 100.0),
            buffer_size: config.buffer_size,
            min_chunk_chars: config.min_chunk_chars,
        }
    }

    /// Chunk a text and attach `metadata` to every chunk.
    ///
    /// Failures are logged and produce no chunks.
    pub async fn create_documents(&self, text: &str, metadata: &ChunkMetadata) -> Vec<DocumentChunk> {
        match self.split_text(text).await {
            Ok(chunks) => {
                tracing::debug!("Split text into {} semantic chunks", chunks.len());
                chunks
                    .into_iter()
                    .map(|chunk| DocumentChunk::new(chunk, metadata.clone()))
                    .collect()
            }
            Err(e) => {
                tracing::error!("Error splitting text into semantic chunks: {}", e);
                Vec::new()
            }
        }
    }

    /// Split a text into semantically coherent passages
    pub async fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let sentences: Vec<&str> = text
            .unicode_sentences()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.len() <= 1 {
            return Ok(sentences.into_iter().map(str::to_string).collect());
        }

        let windows = self.combine_sentences(&sentences);
        let embeddings = self.embedder.embed_batch(&windows).await?;
        if embeddings.len() != sentences.len() {
            return Err(Error::embedding(format!(
                "Expected {} sentence embeddings, got {}",
                sentences.len(),
                embeddings.len()
            )));
        }

        let distances: Vec<f32> = embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
            .collect();
        let threshold = percentile(&distances, self.breakpoint_percentile);

        let mut chunks = Vec::new();
        let mut start = 0;
        for (i, distance) in distances.iter().enumerate() {
            if *distance <= threshold {
                continue;
            }
            let chunk = sentences[start..=i].join(" ");
            if chunk.chars().count() < self.min_chunk_chars {
                continue;
            }
            chunks.push(chunk);
            start = i + 1;
        }
        if start < sentences.len() {
            chunks.push(sentences[start..].join(" "));
        }

        Ok(chunks)
    }

    /// Each sentence joined with `buffer_size` neighbours on either side
    fn combine_sentences(&self, sentences: &[&str]) -> Vec<String> {
        (0..sentences.len())
            .map(|i| {
                let from = i.saturating_sub(self.buffer_size);
                let to = (i + self.buffer_size + 1).min(sentences.len());
                sentences[from..to].join(" ")
            })
            .collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Linear-interpolated percentile of `values`
fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = pct / 100.0 * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f32;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
