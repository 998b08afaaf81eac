//! Retrieval-augmented answers, whole or streamed

use futures::future;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{AssistantConfig, RagConfig};
use crate::error::Result;
use crate::generation::{CancellationToken, PromptBuilder};
use crate::providers::{LlmProvider, Providers, TextStream};
use crate::retrieval::{RetrievalResult, Retriever};

/// Question used to probe the vector store
const PROBE_QUESTION: &str = "What constituted the Trans-saharan trade?";

/// Outcome of a single answer request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// "Success", or the failure description
    pub message: String,
    /// Generated text, `None` on failure
    pub response: Option<String>,
}

impl Answer {
    pub fn success(response: String) -> Self {
        Self {
            message: "Success".to_string(),
            response: Some(response),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.response.is_some()
    }
}

/// Answers questions from retrieved context
#[derive(Clone)]
pub struct AnswerEngine {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    assistant: AssistantConfig,
}

impl AnswerEngine {
    pub fn new(providers: Providers, config: &RagConfig) -> Self {
        Self {
            retriever: Retriever::new(providers.embedder, providers.vector_store, &config.retrieval),
            llm: providers.llm,
            assistant: config.assistant.clone(),
        }
    }

    /// Build the engine against the hosted services named in `config`
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self::new(Providers::from_config(config)?, config))
    }

    /// Name the assistant presents itself with
    pub fn assistant_name(&self) -> &str {
        &self.assistant.name
    }

    /// Answer a query in one LLM call; failures become a failure answer
    pub async fn answer(&self, query: &str) -> Answer {
        match self.generate(query).await {
            Ok(text) => Answer::success(text),
            Err(e) => {
                tracing::error!("Error in {}: {}", self.assistant.name, e);
                Answer::failure(e.to_string())
            }
        }
    }

    /// Answer a query as a stream of text increments.
    ///
    /// Nothing happens until the stream is polled. A failure is the last item; once
    /// `cancel` fires the stream ends and the upstream request is dropped.
    pub fn answer_stream(&self, query: &str, cancel: CancellationToken) -> TextStream {
        let engine = self.clone();
        let query = query.to_string();

        let setup = async move {
            let prompt = engine.prompt_for(&query).await?;
            engine.llm.stream(&prompt).await
        };

        stream::once(setup)
            .flat_map(|started| match started {
                Ok(upstream) => upstream,
                Err(e) => stream::once(future::ready(Err(e))).boxed(),
            })
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
            .take_until(async move { cancel.cancelled().await })
            .boxed()
    }

    /// Probe the vector store with a fixed question
    pub async fn check_vector_store(&self) -> RetrievalResult {
        self.retriever.retrieve_top(PROBE_QUESTION, 1).await
    }

    async fn generate(&self, query: &str) -> Result<String> {
        let prompt = self.prompt_for(query).await?;
        self.llm.complete(&prompt).await
    }

    async fn prompt_for(&self, query: &str) -> Result<String> {
        let results = self.retriever.retrieve(query).await.into_results()?;
        let context = PromptBuilder::build_context(&results);

        Ok(PromptBuilder::build(
            &self.assistant.name,
            &self.assistant.domain,
            &context,
            query,
        ))
    }
}
