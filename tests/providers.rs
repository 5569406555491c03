// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use std::time::Duration;

use common::{chat_reply, StubServer};
use ragpipe::embedding::{EmbeddingProvider, EndpointProvider, GeminiProvider};
use ragpipe::errors::{EmbeddingError, ModelError};
use ragpipe::generation::{GeminiModel, LanguageModel, ModelChain, OpenAiCompatibleModel};
use ragpipe::telemetry::{Level, Telemetry};
use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn endpoint_provider_posts_inputs_with_token() {
    let server = StubServer::start(vec![(200, "[[0.1, 0.2], [0.3, 0.4]]".to_string())]);
    let provider = EndpointProvider::new(
        format!("{}/embed", server.url),
        "test-model",
        Some("secret".to_string()),
        TIMEOUT,
    )
    .unwrap();

    let vectors = provider
        .embed_documents(&["one".to_string(), "two".to_string()])
        .unwrap();
    assert_eq!(vectors.len(), 2);

    let request = &server.requests()[0];
    assert!(request.request_line.starts_with("POST /embed"));
    assert_eq!(request.json()["inputs"], json!(["one", "two"]));
    assert_eq!(request.json()["options"]["wait_for_model"], true);
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer secret"));
}

#[test]
fn endpoint_provider_reports_status_and_count_errors() {
    let server = StubServer::start(vec![
        (503, r#"{"error":"loading"}"#.to_string()),
        (200, "[[0.1, 0.2]]".to_string()),
    ]);
    let provider = EndpointProvider::new(format!("{}/embed", server.url), "m", None, TIMEOUT).unwrap();
    let texts = vec!["a".to_string(), "b".to_string()];

    assert!(matches!(
        provider.embed_documents(&texts),
        Err(EmbeddingError::Status { status: 503, .. })
    ));
    assert!(matches!(
        provider.embed_documents(&texts),
        Err(EmbeddingError::CountMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn endpoint_provider_connection_failure_is_transport_error() {
    let provider = EndpointProvider::new("http://127.0.0.1:9/embed", "m", None, TIMEOUT).unwrap();
    assert!(matches!(
        provider.embed_query("hello"),
        Err(EmbeddingError::Transport(_))
    ));
}

#[test]
fn gemini_provider_batches_documents_and_embeds_query() {
    std::env::set_var("RAGPIPE_TEST_GEMINI_EMBED_KEY", "k123");
    let server = StubServer::start(vec![
        (
            200,
            json!({ "embeddings": [{ "values": [1.0, 0.0] }, { "values": [0.0, 1.0] }] }).to_string(),
        ),
        (200, json!({ "embedding": { "values": [0.5, 0.5] } }).to_string()),
    ]);
    let provider = GeminiProvider::new(
        format!("{}/v1beta", server.url),
        "text-embedding-004",
        "RAGPIPE_TEST_GEMINI_EMBED_KEY",
        TIMEOUT,
    )
    .unwrap();

    let docs = provider
        .embed_documents(&["a".to_string(), "b".to_string()])
        .unwrap();
    assert_eq!(docs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert_eq!(provider.embed_query("q").unwrap(), vec![0.5, 0.5]);

    let requests = server.requests();
    assert!(requests[0]
        .request_line
        .starts_with("POST /v1beta/models/text-embedding-004:batchEmbedContents?key=k123"));
    assert_eq!(requests[0].json()["requests"][1]["taskType"], "RETRIEVAL_DOCUMENT");
    assert!(requests[1].request_line.contains(":embedContent?key=k123"));
    assert_eq!(requests[1].json()["taskType"], "RETRIEVAL_QUERY");
}

#[test]
fn openai_model_sends_bearer_and_parses_reply() {
    std::env::set_var("RAGPIPE_TEST_GROQ_KEY", "gk");
    let server = StubServer::start(vec![(200, chat_reply("Apply online."))]);
    let model = OpenAiCompatibleModel::new(
        &format!("{}/openai/v1", server.url),
        "llama-3.1-8b-instant",
        "RAGPIPE_TEST_GROQ_KEY",
        0.2,
        TIMEOUT,
    )
    .unwrap();

    assert_eq!(model.generate("prompt").unwrap(), "Apply online.");
    let request = &server.requests()[0];
    assert!(request.request_line.starts_with("POST /openai/v1/chat/completions"));
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer gk"));
    assert_eq!(request.json()["messages"][0]["content"], "prompt");
}

#[test]
fn gemini_model_parses_candidates() {
    std::env::set_var("RAGPIPE_TEST_GEMINI_GEN_KEY", "gem");
    let body = json!({
        "candidates": [{ "content": { "parts": [{ "text": "Campus " }, { "text": "life." }] } }]
    });
    let server = StubServer::start(vec![(200, body.to_string())]);
    let model = GeminiModel::new(
        &server.url,
        "gemini-1.5-flash",
        "RAGPIPE_TEST_GEMINI_GEN_KEY",
        0.2,
        TIMEOUT,
    )
    .unwrap();

    assert_eq!(model.generate("p").unwrap(), "Campus life.");
    let request = &server.requests()[0];
    assert!(request
        .request_line
        .starts_with("POST /models/gemini-1.5-flash:generateContent?key=gem"));
    assert_eq!(request.json()["contents"][0]["parts"][0]["text"], "p");
}

#[test]
fn chain_falls_back_on_http_error_with_same_prompt() {
    std::env::set_var("RAGPIPE_TEST_CHAIN_KEY", "ck");
    let primary = StubServer::start(vec![(500, r#"{"error":"overloaded"}"#.to_string())]);
    let fallback = StubServer::start(vec![(200, chat_reply("From fallback"))]);

    let model = |url: &str, name: &str| -> Box<dyn LanguageModel> {
        Box::new(OpenAiCompatibleModel::new(url, name, "RAGPIPE_TEST_CHAIN_KEY", 0.2, TIMEOUT).unwrap())
    };
    let telemetry = Telemetry::capturing();
    let chain = ModelChain::new(
        vec![model(primary.url.as_str(), "primary"), model(fallback.url.as_str(), "fallback")],
        &telemetry,
    );

    let generated = chain.invoke("Context: c\n\nQuestion: q\n\n").unwrap();
    assert_eq!(generated.text, "From fallback");
    assert_eq!(generated.model, "fallback");
    assert_eq!(
        primary.requests()[0].json()["messages"],
        fallback.requests()[0].json()["messages"]
    );
    assert!(telemetry.messages(Level::Error)[0].contains("Triggering fallback to fallback"));
}

#[test]
fn missing_api_key_triggers_fallback() {
    let server = StubServer::start(vec![(200, chat_reply("ok"))]);
    std::env::set_var("RAGPIPE_TEST_PRESENT_KEY", "present");
    let models: Vec<Box<dyn LanguageModel>> = vec![
        Box::new(
            OpenAiCompatibleModel::new(&server.url, "keyless", "RAGPIPE_TEST_ABSENT_KEY", 0.2, TIMEOUT)
                .unwrap(),
        ),
        Box::new(
            OpenAiCompatibleModel::new(&server.url, "keyed", "RAGPIPE_TEST_PRESENT_KEY", 0.2, TIMEOUT)
                .unwrap(),
        ),
    ];
    let chain = ModelChain::new(models, &Telemetry::new());

    assert_eq!(chain.invoke("p").unwrap().model, "keyed");
    assert_eq!(server.requests().len(), 1);
    assert!(matches!(
        OpenAiCompatibleModel::new(&server.url, "x", "RAGPIPE_TEST_ABSENT_KEY", 0.2, TIMEOUT)
            .unwrap()
            .generate("p"),
        Err(ModelError::MissingApiKey(_))
    ));
}

#[test]
fn endpoint_provider_invalid_json_is_malformed() {
    let server = StubServer::start(vec![(200, "<html>busy</html>".to_string())]);
    let provider = EndpointProvider::new(format!("{}/embed", server.url), "m", None, TIMEOUT).unwrap();

    assert!(matches!(
        provider.embed_query("hello"),
        Err(EmbeddingError::Malformed(_))
    ));
}

#[test]
fn gemini_model_accepts_prefixed_model_name() {
    std::env::set_var("RAGPIPE_TEST_GEMINI_PREFIX_KEY", "pk");
    let body = json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] });
    let server = StubServer::start(vec![(200, body.to_string())]);
    let model = GeminiModel::new(
        &server.url,
        "models/gemini-1.5-flash",
        "RAGPIPE_TEST_GEMINI_PREFIX_KEY",
        0.2,
        TIMEOUT,
    )
    .unwrap();

    assert_eq!(model.generate("p").unwrap(), "ok");
    assert!(server.requests()[0]
        .request_line
        .starts_with("POST /models/gemini-1.5-flash:generateContent?key=pk"));
}
