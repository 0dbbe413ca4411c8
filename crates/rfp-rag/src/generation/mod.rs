//! Answer generation and prompt construction

pub mod answer;
pub mod prompt;

pub use answer::{AnswerGenerator, GeneratedAnswer};
pub use prompt::{PromptBuilder, NOT_FOUND_INSTRUCTION};
