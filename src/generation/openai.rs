// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible `/chat/completions` model (Groq by default).

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::model::LanguageModel;
use crate::errors::ModelError;
use crate::http;

pub struct OpenAiCompatibleModel {
    client: Client,
    base_url: String,
    model: String,
    api_key_env: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiCompatibleModel {
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
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        })
    }
}

impl LanguageModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let api_key = http::api_key(&self.api_key_env)
            .ok_or_else(|| ModelError::MissingApiKey(self.api_key_env.clone()))?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()?;
        let response = http::check_status(response)
            .map_err(|(status, body)| ModelError::Status { status, body })?;

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| ModelError::Malformed("no choices returned".to_string()))
    }
}
