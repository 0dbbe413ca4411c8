//! Locating and parsing the JSON block in a model response

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::ExtractionSchema;

const FENCE: &str = "```";

/// The part of a model response that should hold the JSON object.
///
/// The first fenced block wins, with or without a language tag. Text before
/// the fence is used only when that fence is a lone untagged closer (the
/// prompt already opened one). With no fence at all the whole response is
/// the candidate.
pub fn json_candidate(raw: &str) -> &str {
    let text = raw.trim();
    let Some(fence_at) = text.find(FENCE) else {
        return text;
    };

    let after_fence = &text[fence_at + FENCE.len()..];
    // Skip a language tag such as `json`
    let tag_len = after_fence
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_fence.len());
    let body = &after_fence[tag_len..];

    let before = text[..fence_at].trim();
    let lone_closer = tag_len == 0 && !body.contains(FENCE);
    if lone_closer && (before.starts_with('{') || before.starts_with('[')) {
        return before;
    }

    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse one chunk's response.
///
/// Invalid JSON is `MalformedOutput`; valid JSON of the wrong shape is
/// `SchemaMismatch`.
pub fn parse_extraction(raw: &str) -> Result<ExtractionSchema> {
    let candidate = json_candidate(raw);
    if candidate.is_empty() {
        return Err(Error::MalformedOutput("response contained no JSON".into()));
    }

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| Error::MalformedOutput(format!("not valid JSON: {}", e)))?;

    ExtractionSchema::from_json(value).map_err(|e| Error::SchemaMismatch(e.to_string()))
}
