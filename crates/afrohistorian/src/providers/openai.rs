//! OpenAI chat completions client with retry and SSE streaming

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::llm::{LlmProvider, TextStream};

/// OpenAI-compatible chat completions provider
pub struct OpenAiChat {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(Error::config("OPENAI_API_KEY not found in environment variables."));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "Completion failed: HTTP {} - {}",
                status, body
            )));
        }

        Ok(response)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.config.model);

        self.retry_request(|| async {
            let response = self.send(prompt, false).await?;
            let body: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse completion response: {}", e)))?;

            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Error::llm("No choices returned from completion API"))
        })
        .await
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        tracing::info!("Streaming answer with model: {}", self.config.model);

        let response = self.send(prompt, true).await?;
        Ok(sse_text_stream(response.bytes_stream().boxed()))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Event decoded from a server-sent-events body
#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
}

/// Incremental decoder for `data:` lines; network chunks may split lines
/// (and multi-byte characters) anywhere, so bytes are buffered until a full line arrives
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            events.extend(Self::decode_bytes(&line[..line_end]));
        }
        events
    }

    /// Decode whatever is left once the body has ended
    fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        Self::decode_bytes(&line)
    }

    fn decode_bytes(line: &[u8]) -> Option<SseEvent> {
        match std::str::from_utf8(line) {
            Ok(line) => Self::decode_line(line.trim()),
            Err(e) => {
                tracing::warn!("Skipping streaming line with invalid UTF-8: {}", e);
                None
            }
        }
    }

    fn decode_line(line: &str) -> Option<SseEvent> {
        let data = line.strip_prefix("data:")?.trim();
        if data == "[DONE]" {
            return Some(SseEvent::Done);
        }

        match serde_json::from_str::<StreamResponse>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|text| !text.is_empty())
                .map(SseEvent::Delta),
            Err(e) => {
                tracing::warn!("Failed to parse streaming chunk: {} for data: {}", e, data);
                None
            }
        }
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turn an SSE response body into text increments
fn sse_text_stream(body: BoxStream<'static, reqwest::Result<Bytes>>) -> TextStream {
    let state = StreamState {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(text) = state.pending.pop_front() {
                return Some((Ok(text), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for event in state.decoder.push(&bytes) {
                        match event {
                            SseEvent::Delta(text) => state.pending.push_back(text),
                            SseEvent::Done => state.finished = true,
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(Error::llm(format!("Stream error: {}", e))), state));
                }
                None => {
                    state.finished = true;
                    if let Some(SseEvent::Delta(text)) = state.decoder.finish() {
                        state.pending.push_back(text);
                    }
                }
            }
        }
    })
    .boxed()
}
