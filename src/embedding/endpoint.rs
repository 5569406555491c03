// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature-extraction endpoint provider.
//!
//! Talks to anything that accepts `{"inputs": [...]}` and answers with a JSON
//! array of vectors: the hosted HuggingFace inference API or a locally run
//! text-embeddings-inference server.

use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::provider::{ensure_count, EmbeddingProvider};
use crate::errors::EmbeddingError;
use crate::http;

pub struct EndpointProvider {
    client: Client,
    url: String,
    model: String,
    token: Option<String>,
    required_token_env: Option<String>,
}

impl EndpointProvider {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            url: url.into(),
            model: model.into(),
            token,
            required_token_env: None,
        })
    }

    /// Makes [`EmbeddingProvider::check_ready`] fail when no token was found
    /// in `env`.
    pub fn require_token(mut self, env: impl Into<String>) -> Self {
        self.required_token_env = Some(env.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl EmbeddingProvider for EndpointProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn check_ready(&self) -> Result<(), EmbeddingError> {
        match (&self.token, &self.required_token_env) {
            (None, Some(env)) => Err(EmbeddingError::MissingApiKey(env.clone())),
            _ => Ok(()),
        }
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "inputs": texts, "options": { "wait_for_model": true } }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = http::check_status(request.send()?)
            .map_err(|(status, body)| EmbeddingError::Status { status, body })?;
        let parsed: Value = response
            .json()
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        ensure_count(parse_vectors(&parsed)?, texts.len())
    }
}

/// Accepts `[[f32]]`, or `[[[f32]]]` token-level output which is mean-pooled.
fn parse_vectors(value: &Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let rows = value
        .as_array()
        .ok_or_else(|| EmbeddingError::Malformed("expected a JSON array".to_string()))?;

    rows.iter()
        .map(|row| {
            let items = row.as_array().ok_or_else(|| {
                EmbeddingError::Malformed("embedding row must be an array".to_string())
            })?;
            match items.first() {
                Some(Value::Array(_)) => mean_pool(items),
                _ => numbers(items),
            }
        })
        .collect()
}

fn numbers(items: &[Value]) -> Result<Vec<f32>, EmbeddingError> {
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::Malformed("embedding value must be a number".to_string()))
        })
        .collect()
}

fn mean_pool(tokens: &[Value]) -> Result<Vec<f32>, EmbeddingError> {
    let vectors = tokens
        .iter()
        .map(|t| {
            t.as_array()
                .ok_or_else(|| EmbeddingError::Malformed("token row must be an array".to_string()))
                .and_then(|items| numbers(items))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    if vectors.iter().any(|v| v.len() != dim) {
        return Err(EmbeddingError::Malformed(
            "token vectors have differing lengths".to_string(),
        ));
    }

    let mut pooled = vec![0.0_f32; dim];
    for vector in &vectors {
        for (acc, value) in pooled.iter_mut().zip(vector) {
            *acc += value;
        }
    }
    let n = vectors.len().max(1) as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    Ok(pooled)
}
