// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini embedding provider (`batchEmbedContents` / `embedContent`).

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::provider::{ensure_count, EmbeddingProvider};
use crate::errors::EmbeddingError;
use crate::http;

const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";
const TASK_QUERY: &str = "RETRIEVAL_QUERY";

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key_env: String,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

impl GeminiProvider {
    /// The API key is read from `api_key_env` on every call, so a missing key
    /// surfaces as a typed error rather than at construction.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key_env: api_key_env.into(),
        })
    }

    fn api_key(&self) -> Result<String, EmbeddingError> {
        http::api_key(&self.api_key_env)
            .ok_or_else(|| EmbeddingError::MissingApiKey(self.api_key_env.clone()))
    }

    fn model_path(&self) -> String {
        http::gemini_model_path(&self.model)
    }

    fn post(&self, method: &str, body: &Value) -> Result<reqwest::blocking::Response, EmbeddingError> {
        let url = format!("{}/{}:{}", self.base_url, self.model_path(), method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .json(body)
            .send()?;
        http::check_status(response).map_err(|(status, body)| EmbeddingError::Status { status, body })
    }

    fn content(&self, text: &str, task: &str) -> Value {
        json!({
            "model": self.model_path(),
            "content": { "parts": [{ "text": text }] },
            "taskType": task,
        })
    }
}

impl EmbeddingProvider for GeminiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn check_ready(&self) -> Result<(), EmbeddingError> {
        self.api_key().map(|_| ())
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<Value> = texts
            .iter()
            .map(|t| self.content(t, TASK_DOCUMENT))
            .collect();
        let response = self.post("batchEmbedContents", &json!({ "requests": requests }))?;
        let parsed: BatchEmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        ensure_count(
            parsed.embeddings.into_iter().map(|e| e.values).collect(),
            texts.len(),
        )
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self.post("embedContent", &self.content(text, TASK_QUERY))?;
        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;
        Ok(parsed.embedding.values)
    }
}
