// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{chat_reply, write_campus_corpus, write_file, StubServer};
use ragpipe::config::{Config, IdStrategy, ModelConfig, ModelProvider};
use ragpipe::embedding::{BackendRegistry, EmbeddingProvider, HashingProvider};
use ragpipe::generation::APOLOGY;
use ragpipe::index::{VectorIndex, INDEX_FILE};
use ragpipe::retriever::{Retrieve, Retriever};
use ragpipe::telemetry::Telemetry;
use ragpipe::Pipeline;
use tempfile::TempDir;

fn config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.index.base_path = Some(dir.join("index"));
    config.index.top_k = Some(2);
    config.generation.prompt_path = Some(dir.join("missing-prompt.txt"));
    config.generation.models = Some(Vec::new());
    config
}

fn hashing_index(config: &Config) -> VectorIndex {
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(HashingProvider::new(config.embeddings.hashing.dimension()));
    let index = VectorIndex::for_backend(&config.index, "hashing", provider, &Telemetry::new()).unwrap();
    index.initialize();
    index
}

#[test]
fn ingest_then_retrieve_ranks_matching_document_first() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);
    let config = config(dir.path());

    let report = Pipeline::new(config.clone(), &Telemetry::new())
        .ingest(&corpus, "hashing")
        .unwrap();
    assert_eq!(report.documents_loaded, 2);
    assert_eq!(report.chunks_ingested, 2);
    assert_eq!(report.batches, 1);
    assert!(report.skipped.is_empty());

    let retriever = Retriever::new(Arc::new(hashing_index(&config)), config.index.top_k());
    let results = retriever.retrieve("apply");
    assert_eq!(results.len(), 2);
    assert!(results[0].source().ends_with("a.txt"));
    assert!(results[0].score >= results[1].score);
    assert_eq!(results[0].text, "Admissions info: apply online.");
}

#[test]
fn query_sends_retrieved_context_to_model() {
    std::env::set_var("RAGPIPE_FLOW_MODEL_KEY", "flow");
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);

    let server = StubServer::start(vec![(200, chat_reply("Apply online."))]);
    let mut config = config(dir.path());
    config.generation.models = Some(vec![ModelConfig {
        provider: ModelProvider::Openai,
        model: "stub-model".to_string(),
        base_url: Some(server.url.clone()),
        api_key_env: Some("RAGPIPE_FLOW_MODEL_KEY".to_string()),
        temperature: None,
    }]);

    let pipeline = Pipeline::new(config, &Telemetry::new());
    pipeline.ingest(&corpus, "hashing").unwrap();
    let response = pipeline.query("How do I apply?", "hashing");

    assert_eq!(response.answer, "Apply online.");
    assert_eq!(response.model.as_deref(), Some("stub-model"));
    assert_eq!(response.sources.len(), 2);

    let prompt = server.requests()[0].json()["messages"][0]["content"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(prompt.starts_with("Context: "));
    assert!(prompt.contains("Admissions info: apply online."));
    assert!(prompt.contains("Campus life details."));
    assert!(prompt.ends_with("Question: How do I apply?\n\n"));
}

#[test]
fn query_with_failing_models_returns_apology_and_sources() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);
    let mut config = config(dir.path());
    config.generation.models = Some(vec![ModelConfig {
        provider: ModelProvider::Openai,
        model: "unreachable".to_string(),
        base_url: Some("http://127.0.0.1:9/v1".to_string()),
        api_key_env: Some("RAGPIPE_FLOW_UNSET_KEY".to_string()),
        temperature: None,
    }]);

    let pipeline = Pipeline::new(config, &Telemetry::new());
    pipeline.ingest(&corpus, "hashing").unwrap();
    let response = pipeline.query("apply", "hashing");

    assert_eq!(response.answer, APOLOGY);
    assert!(response.model.is_none());
    assert_eq!(response.sources.len(), 2);
}

#[test]
fn reingest_with_hash_ids_overwrites() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);
    let config = config(dir.path());
    let pipeline = Pipeline::new(config.clone(), &Telemetry::new());

    pipeline.ingest(&corpus, "hashing").unwrap();
    pipeline.ingest(&corpus, "hashing").unwrap();

    assert_eq!(hashing_index(&config).count().unwrap(), 2);
}

#[test]
fn reingest_with_random_ids_appends() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);
    let mut config = config(dir.path());
    config.index.id_strategy = Some(IdStrategy::Random);
    let pipeline = Pipeline::new(config.clone(), &Telemetry::new());

    pipeline.ingest(&corpus, "hashing").unwrap();
    pipeline.ingest(&corpus, "hashing").unwrap();

    assert_eq!(hashing_index(&config).count().unwrap(), 4);
}

#[test]
fn backends_write_separate_indexes() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);

    let mut registry = BackendRegistry::builtin();
    registry
        .register("tiny", &["small"], |_config: &Config| {
            Ok(Box::new(HashingProvider::new(16)) as Box<dyn EmbeddingProvider>)
        })
        .unwrap();
    let pipeline = Pipeline::new(config(dir.path()), &Telemetry::new()).with_registry(registry);

    let tiny = pipeline.ingest(&corpus, "SMALL").unwrap();
    let hashing = pipeline.ingest(&corpus, "hashing").unwrap();

    assert_eq!(tiny.backend, "tiny");
    assert_eq!(hashing.backend, "hashing");
    let base = dir.path().join("index");
    assert!(base.join("tiny").join(INDEX_FILE).is_file());
    assert!(base.join("hashing").join(INDEX_FILE).is_file());
}

#[test]
fn markdown_headers_survive_to_search_results() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_file(
        &corpus.join("guide.md"),
        "# Admissions\n\nApply online before March.\n\n## Fees\n\nTuition is listed per semester.\n",
    );
    let config = config(dir.path());

    let report = Pipeline::new(config.clone(), &Telemetry::new())
        .ingest(&corpus, "hashing")
        .unwrap();
    assert_eq!(report.chunks_ingested, 2);

    let results = hashing_index(&config).search("tuition semester", 1);
    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert!(hit.text.contains("Tuition is listed per semester."));
    assert_eq!(hit.metadata["header_1"], "Admissions");
    assert_eq!(hit.metadata["header_2"], "Fees");
    assert_eq!(hit.metadata["header_path"], "Admissions > Fees");
    assert!(hit.source().ends_with("guide.md"));
}

#[test]
fn unsupported_files_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus");
    write_campus_corpus(&corpus);
    write_file(&corpus.join("logo.png"), "not really a png");

    let report = Pipeline::new(config(dir.path()), &Telemetry::new())
        .ingest(&corpus, "hashing")
        .unwrap();

    assert_eq!(report.chunks_ingested, 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].item.ends_with("logo.png"));
}
