//! LLM provider trait for generating answers

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Lazily produced text increments of a streamed completion.
///
/// A failure is delivered as an `Err` item after the text produced so far; the
/// stream ends right after it.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI-compatible chat completions API
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt in one call
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Complete a prompt as a stream of text increments
    async fn stream(&self, prompt: &str) -> Result<TextStream>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
