// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking HTTP client shared by embedding and model backends.

use reqwest::blocking::{Client, Response};
use std::time::Duration;

/// Builds a client whose every request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ragpipe/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Splits a response into success or `(status, body)` for error reporting.
pub fn check_status(response: Response) -> Result<Response, (u16, String)> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().unwrap_or_default();
        Err((status.as_u16(), truncate_body(&body)))
    }
}

/// Reads an API key from the environment, treating blank values as unset.
pub fn api_key(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Gemini resource name for `model`, adding the `models/` prefix when absent.
pub fn gemini_model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX_CHARS: usize = 512;
    match body.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "x".repeat(600);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 515);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_gemini_model_path() {
        assert_eq!(gemini_model_path("gemini-1.5-flash"), "models/gemini-1.5-flash");
        assert_eq!(gemini_model_path("models/gemini-1.5-flash"), "models/gemini-1.5-flash");
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        assert_eq!(api_key("RAGPIPE_TEST_SURELY_UNSET_VAR"), None);
    }
}
