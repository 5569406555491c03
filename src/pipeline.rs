// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion and query pipelines
//!
//! `ingest` runs loader, splitter, embedding provider and vector index as one
//! sequential batch job. `query` runs retrieval and generation for a single
//! question and always produces an answer.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, IdStrategy};
use crate::document::{Chunk, RetrievalResult, Skipped};
use crate::embedding::{Backend, BackendRegistry, EmbeddingProvider};
use crate::errors::{Error, Result};
use crate::generation::{GenerationChain, ModelChain, PromptTemplate};
use crate::index::VectorIndex;
use crate::loader::DocumentLoader;
use crate::retriever::{Retrieve, Retriever};
use crate::splitter::{ChunkConfig, DocumentSplitter};
use crate::telemetry::Telemetry;

/// Outcome of an ingestion run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestReport {
    /// Canonical backend id the corpus was ingested for.
    pub backend: String,
    pub documents_loaded: usize,
    pub chunks_produced: usize,
    /// Chunks written to the index.
    pub chunks_ingested: usize,
    pub batches: usize,
    /// Files, documents and batches that could not be processed.
    pub skipped: Vec<Skipped>,
}

/// Answer to one question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: RetrievalResult,
    /// Model that produced the answer; `None` when generation failed.
    pub model: Option<String>,
}

/// Deterministic id for a chunk: blake3 over source, offset and content.
pub fn chunk_id(chunk: &Chunk) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(chunk.source().as_bytes());
    hasher.update(&[0]);
    hasher.update(chunk.start_index().unwrap_or(0).to_string().as_bytes());
    hasher.update(&[0]);
    hasher.update(chunk.content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Fills in `chunk.id` according to `strategy`.
pub fn assign_ids(chunks: &mut [Chunk], strategy: IdStrategy) {
    for chunk in chunks.iter_mut() {
        chunk.id = match strategy {
            IdStrategy::Hash => chunk_id(chunk),
            IdStrategy::Random => uuid::Uuid::new_v4().to_string(),
        };
    }
}

/// Retrieval step used when no index is available.
struct NoRetrieval;

impl Retrieve for NoRetrieval {
    fn retrieve(&self, _query: &str) -> RetrievalResult {
        Vec::new()
    }
}

pub struct Pipeline {
    config: Config,
    registry: BackendRegistry,
    show_progress: bool,
    telemetry: Telemetry,
}

impl Pipeline {
    /// Pipeline over the built-in backends.
    pub fn new(config: Config, telemetry: &Telemetry) -> Self {
        Self {
            config,
            registry: BackendRegistry::builtin(),
            show_progress: false,
            telemetry: telemetry.scoped("pipeline"),
        }
    }

    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Shows progress bars for loading and indexing.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    fn provider(&self, backend: &str) -> Result<(Backend, Arc<dyn EmbeddingProvider>)> {
        let entry = self
            .registry
            .resolve(backend)
            .cloned()
            .ok_or_else(|| Error::UnknownBackend(backend.to_string()))?;
        let provider = entry.build(&self.config).map_err(|e| Error::Provider {
            backend: entry.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok((entry, Arc::from(provider)))
    }

    /// Loads, splits, embeds and stores every supported file under `corpus`.
    ///
    /// Fails only on configuration problems: an unknown backend, a provider
    /// that cannot be constructed or lacks its credentials, an invalid chunk
    /// configuration, or an index that cannot be opened. Per-item failures end up in
    /// [`IngestReport::skipped`].
    pub fn ingest(&self, corpus: &Path, backend: &str) -> Result<IngestReport> {
        let (entry, provider) = self.provider(backend)?;
        let backend_id = entry.id();
        provider.check_ready().map_err(|e| Error::Provider {
            backend: backend_id.to_string(),
            reason: e.to_string(),
        })?;
        let chunk_config = ChunkConfig::for_backend(&self.config.splitter, backend_id)?;

        let index = VectorIndex::for_backend(&self.config.index, backend_id, provider, &self.telemetry)?
            .with_progress(self.show_progress);
        if index.exists() {
            self.telemetry.warn(format!(
                "Index already exists at {}; new chunks will be added to it",
                index.path().display()
            ));
        }
        index.initialize();
        if !index.is_initialized() {
            return Err(Error::IndexUnavailable {
                path: index.path().to_path_buf(),
            });
        }

        let mut report = IngestReport {
            backend: backend_id.to_string(),
            ..Default::default()
        };

        let loaded = DocumentLoader::new(&self.config.loader, &self.telemetry)
            .with_progress(self.show_progress)
            .load(corpus);
        report.documents_loaded = loaded.documents.len();
        report.skipped.extend(loaded.skipped);
        if loaded.documents.is_empty() {
            self.telemetry
                .warn(format!("No documents to ingest from {}", corpus.display()));
            return Ok(report);
        }

        let split = DocumentSplitter::new(chunk_config, &self.telemetry).split(&loaded.documents);
        let mut chunks = split.chunks;
        report.chunks_produced = chunks.len();
        report.skipped.extend(split.skipped);

        assign_ids(&mut chunks, self.config.index.id_strategy());
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let added = index.add(&ids, None, &chunks)?;
        report.chunks_ingested = added.inserted;
        report.batches = added.batches;
        report.skipped.extend(added.skipped);

        self.telemetry.info(format!(
            "Ingested {} chunks from {} documents into {} ({} skipped)",
            report.chunks_ingested,
            report.documents_loaded,
            index.path().display(),
            report.skipped.len()
        ));
        Ok(report)
    }

    /// Answers `question` using the index of `backend`. Never fails: missing
    /// indexes or providers degrade to an answer without context, and total
    /// generation failure yields the apology text.
    pub fn query(&self, question: &str, backend: &str) -> QueryResponse {
        let retriever = self.retriever(backend);

        let template =
            PromptTemplate::load_or_fallback(&self.config.generation.prompt_path(), &self.telemetry);
        let models = ModelChain::from_config(
            &self.config.generation.models(),
            self.config.http.timeout(),
            &self.telemetry,
        )
        .unwrap_or_else(|e| {
            self.telemetry
                .error(format!("Failed to construct language models: {}", e));
            ModelChain::new(Vec::new(), &self.telemetry)
        });

        let answer = GenerationChain::new(retriever, template, models, &self.telemetry).answer(question);
        QueryResponse {
            answer: answer.text,
            sources: answer.sources,
            model: answer.model,
        }
    }

    fn retriever(&self, backend: &str) -> Arc<dyn Retrieve> {
        let index = self.provider(backend).and_then(|(entry, provider)| {
            VectorIndex::for_backend(&self.config.index, entry.id(), provider, &self.telemetry)
        });
        let index = match index {
            Ok(index) => index,
            Err(e) => {
                self.telemetry
                    .error(format!("Retrieval unavailable, answering without context: {}", e));
                return Arc::new(NoRetrieval);
            }
        };

        if !index.exists() {
            self.telemetry.warn(format!(
                "No index at {}; run `ragpipe ingest` first",
                index.path().display()
            ));
            return Arc::new(NoRetrieval);
        }
        index.initialize();
        Arc::new(Retriever::new(Arc::new(index), self.config.index.top_k()))
    }
}
