//! Deterministic providers and request helpers for HTTP tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use http_body_util::BodyExt;
use regex::Regex;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use rfp_rag::providers::{EmbeddingProvider, LlmProvider};
use rfp_rag::retrieval::RerankStage;
use rfp_rag::server::{build_router, state::AppState};
use rfp_rag::{RagConfig, RagSession, Result};

pub const BOUNDARY: &str = "rfp-rag-test-boundary";

pub const RFP_TEXT: &str = "Request for Proposals\n\n\
Solicitation Number: ABC-123\n\n\
Proposals must not exceed 30 pages for the technical volume.\n\n\
ISO 9001 certification is required by March 2024.\n";

/// Bag-of-words embedder over hashed word buckets
pub struct HashEmbedder;

const DIMS: usize = 64;

fn bucket(word: &str) -> usize {
    // FNV-1a
    let hash = word.bytes().fold(0xcbf29ce484222325u64, |h, b| {
        (h ^ b as u64).wrapping_mul(0x100000001b3)
    });
    (hash % DIMS as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIMS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[bucket(word)] += 1.0;
        }
        // Keep every vector non-zero
        vector[0] += 0.01;
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Answers extraction prompts by reading the section text, everything else
/// with a fixed sentence
pub struct ScriptedLlm {
    solicitation: Regex,
    page_limit: Regex,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            solicitation: Regex::new(r"Solicitation Number:\s*(\S+)").unwrap(),
            page_limit: Regex::new(r"exceed (\d+) pages for the ([\w ]+?)\.").unwrap(),
        }
    }

    fn extract(&self, section: &str) -> String {
        let solicitation = self
            .solicitation
            .captures(section)
            .map(|c| c[1].to_string());
        let page_limits: Vec<Value> = self
            .page_limit
            .captures_iter(section)
            .map(|c| json!({ "section": &c[2], "page_limit": c[1].parse::<u32>().unwrap() }))
            .collect();

        let record = json!({
            "issuing_agency": null,
            "solicitation_number": solicitation,
            "submission_details": null,
            "formatting_requirements": { "page_limits": page_limits },
            "eligibility_criteria": []
        });
        format!("```json\n{}\n```", record)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match prompt.split("-------\n").nth(1) {
            Some(section) if prompt.contains("RFP Text Section:") => Ok(self.extract(section)),
            _ => Ok("The technical volume is limited to 30 pages.".to_string()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Router wired to mock providers, storing uploads under `uploads_dir`
pub fn test_app(uploads_dir: &Path) -> Router {
    let mut config = RagConfig::default();
    config.storage.uploads_dir = uploads_dir.to_path_buf();

    let llm = Arc::new(ScriptedLlm::new());
    let session = RagSession::new(
        config,
        Arc::new(HashEmbedder),
        llm.clone(),
        llm,
        RerankStage::pass_through(),
    )
    .unwrap();

    build_router(AppState::from_session(session)).unwrap()
}

fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    multipart_request("/upload", &[("file", Some(filename), content)])
}

pub fn multipart_query(question: &str) -> Request<Body> {
    multipart_request("/query", &[("question", None, question.as_bytes())])
}

pub fn form_query(encoded_body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(encoded_body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
