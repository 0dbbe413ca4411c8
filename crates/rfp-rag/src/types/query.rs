//! Query request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Question submitted to `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }

    /// Trimmed, lower-cased question with runs of whitespace collapsed.
    pub fn normalized(&self) -> Result<String> {
        let question = self
            .question
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if question.is_empty() {
            return Err(Error::EmptyInput("question must not be empty".into()));
        }
        Ok(question)
    }
}
