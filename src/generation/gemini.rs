// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini `generateContent` model.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::model::LanguageModel;
use crate::errors::ModelError;
use crate::http;

pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key_env: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiModel {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key_env: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            temperature,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        })
    }
}

impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let api_key = http::api_key(&self.api_key_env)
            .ok_or_else(|| ModelError::MissingApiKey(self.api_key_env.clone()))?;

        let url = format!(
            "{}/{}:generateContent",
            self.base_url,
            http::gemini_model_path(&self.model)
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&self.request_body(prompt))
            .send()?;
        let response = http::check_status(response)
            .map_err(|(status, body)| ModelError::Status { status, body })?;

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, ModelError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Malformed("no candidates returned".to_string()))?;

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}
