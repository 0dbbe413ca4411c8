//! Prompt templates for answering and extraction

use std::sync::OnceLock;

use crate::retrieval::ScoredChunk;
use crate::types::ExtractionSchema;

/// Sentence that makes the model admit missing information instead of guessing
pub const NOT_FOUND_INSTRUCTION: &str =
    "If not explicitly stated, indicate that the information is not found in the provided context.";

/// Prompt builder for answer and extraction calls
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunks into one context block, best first
    pub fn build_context(results: &[ScoredChunk]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            let source = &result.chunk.source;
            let reference = match source.page_number {
                Some(page) => format!("{}, Page {}", source.filename, page),
                None => source.filename.clone(),
            };

            context.push_str(&format!(
                "[{}] {}\n{}\n\n",
                i + 1,
                reference,
                result.chunk.content.trim()
            ));
        }

        context
    }

    /// Grounded question-answering prompt
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Based on the following context, please answer the question.
If the answer is explicitly stated in the context, use that information.
{not_found}

Context:
{context}

Question: {question}

Answer:"#,
            not_found = NOT_FOUND_INSTRUCTION,
            context = context.trim_end(),
            question = question
        )
    }

    /// JSON schema of [`ExtractionSchema`], rendered once
    pub fn extraction_schema() -> &'static str {
        static SCHEMA: OnceLock<String> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let schema = schemars::schema_for!(ExtractionSchema);
            serde_json::to_string_pretty(&schema).unwrap_or_default()
        })
    }

    /// Per-chunk structured extraction prompt. Ends with an opening fence.
    pub fn build_extraction_prompt(section_text: &str) -> String {
        format!(
            r#"You are an expert assistant analyzing sections of a Request for Proposals (RFP).
Carefully read the following RFP text section and extract ONLY the information relevant to this section that matches the JSON schema.
Format your output strictly according to the provided JSON schema.
If information for a field is not present IN THIS SECTION, omit the field or use null. Do not guess information from other potential sections.

IMPORTANT: Your response MUST be ONLY the JSON object requested, enclosed in triple backticks using the json format marker (```json ... ```).
Do NOT include any explanations, apologies, greetings, or any other text outside the ```json ... ``` block.

The output must be a JSON object that conforms to this JSON schema:
```
{schema}
```

RFP Text Section:
-------
{section}
-------

Extracted Information from this section (JSON):
```json
"#,
            schema = Self::extraction_schema(),
            section = section_text.trim()
        )
    }
}
