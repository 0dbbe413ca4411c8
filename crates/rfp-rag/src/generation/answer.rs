//! Grounded answer generation

use std::sync::Arc;
use std::time::Instant;

use super::prompt::PromptBuilder;
use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::ScoredChunk;

/// Answer text plus the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

/// Turns a question and retrieved context into an answer
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Prompt the model with the context chunks in rank order.
    pub async fn answer(
        &self,
        question: &str,
        context_chunks: Vec<ScoredChunk>,
    ) -> Result<GeneratedAnswer> {
        let start = Instant::now();
        let context = PromptBuilder::build_context(&context_chunks);
        let prompt = PromptBuilder::build_answer_prompt(question, &context);

        let answer = self.llm.generate(&prompt).await?;

        tracing::info!(
            model = self.llm.model(),
            sources = context_chunks.len(),
            "Generated answer in {:?}",
            start.elapsed()
        );

        Ok(GeneratedAnswer {
            answer: answer.trim().to_string(),
            sources: context_chunks,
        })
    }
}
