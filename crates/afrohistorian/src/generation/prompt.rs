//! Prompt template for answer generation

use crate::providers::VectorSearchResult;

/// Prompt builder for the assistant persona
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from search results
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n{}\n\n",
                i + 1,
                Self::format_source_ref(result),
                result.chunk.text.trim()
            ));
        }

        context
    }

    /// Format source reference for context
    fn format_source_ref(result: &VectorSearchResult) -> String {
        let metadata = &result.chunk.metadata;
        let mut parts = vec![metadata.source.clone()];

        if let Some(title) = &metadata.title {
            parts.push(title.clone());
        }
        parts.push(format!("by {}", metadata.author));
        if let Some(year) = &metadata.year {
            parts.push(year.clone());
        }

        parts.join(", ")
    }

    /// Build the full prompt: persona, retrieved context, then the question
    pub fn build(name: &str, domain: &str, context: &str, question: &str) -> String {
        format!(
            r#"You are {name}, an AI assistant that specializes in {domain}.
Your task is to provide accurate and detailed information about various aspects of {domain}, including significant events, cultural practices, historical figures, and more.

Here are some documents for context: {context}
Based on the provided documents, please answer the following question: {question}"#,
            name = name,
            domain = domain,
            context = context,
            question = question
        )
    }
}
