// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent vector index.
//!
//! Each embedding backend owns a directory `base/<backend_id>` holding an
//! `index.sqlite` file, so vectors of different dimensionality never mix.
//! Inserts are embedded and written in sequential batches; a failed batch is
//! reported and the rest still run.

pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::IndexConfig;
use crate::document::{Chunk, Metadata, RetrievalResult, Skipped, Stage};
use crate::embedding::{is_valid_backend_id, EmbeddingProvider};
use crate::errors::{EmbeddingError, Error, IndexError};
use crate::output;
use crate::telemetry::Telemetry;
use storage::{ChunkStore, VectorRecord};

/// Database file name inside a collection directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Records embedded and written per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Directory holding the index for `backend_id` under `base`.
pub fn collection_path(base: &Path, backend_id: &str) -> crate::errors::Result<PathBuf> {
    if !is_valid_backend_id(backend_id) {
        return Err(Error::Config(format!(
            "backend id '{}' must match [a-z0-9_-]+",
            backend_id
        )));
    }
    Ok(base.join(backend_id))
}

/// Summary of one [`VectorIndex::add`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddReport {
    /// Records written.
    pub inserted: usize,
    /// Batches attempted.
    pub batches: usize,
    /// Batches that failed.
    pub skipped: Vec<Skipped>,
}

pub struct VectorIndex {
    path: PathBuf,
    collection: String,
    batch_size: usize,
    show_progress: bool,
    provider: Arc<dyn EmbeddingProvider>,
    store: Mutex<Option<ChunkStore>>,
    telemetry: Telemetry,
}

impl VectorIndex {
    /// Index stored in the directory `path`. Nothing touches the disk until
    /// [`VectorIndex::initialize`] or the first [`VectorIndex::add`].
    pub fn new(
        path: impl Into<PathBuf>,
        collection: impl Into<String>,
        provider: Arc<dyn EmbeddingProvider>,
        telemetry: &Telemetry,
    ) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: false,
            provider,
            store: Mutex::new(None),
            telemetry: telemetry.scoped("index"),
        }
    }

    /// Index for `backend_id` as configured in `[index]`.
    pub fn for_backend(
        config: &IndexConfig,
        backend_id: &str,
        provider: Arc<dyn EmbeddingProvider>,
        telemetry: &Telemetry,
    ) -> crate::errors::Result<Self> {
        let path = collection_path(&config.base_path(), backend_id)?;
        Ok(Self::new(path, config.collection(), provider, telemetry)
            .with_batch_size(config.batch_size()))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Shows a progress bar while batches are written.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Collection directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// True when the database file already exists on disk.
    pub fn exists(&self) -> bool {
        self.path.join(INDEX_FILE).is_file()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ChunkStore>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates the directory and opens the store. Safe to call repeatedly.
    /// Failures are logged; check [`VectorIndex::is_initialized`].
    pub fn initialize(&self) {
        let mut guard = self.lock();
        if guard.is_some() {
            return;
        }

        let existed = self.path.is_dir();
        if let Err(e) = std::fs::create_dir_all(&self.path) {
            self.telemetry.error(format!(
                "Failed to create index directory {}: {}",
                self.path.display(),
                e
            ));
            return;
        }
        if existed {
            self.telemetry
                .info(format!("Using existing index directory {}", self.path.display()));
        } else {
            self.telemetry
                .info(format!("Created index directory {}", self.path.display()));
        }

        match ChunkStore::open(self.path.join(INDEX_FILE), &self.collection) {
            Ok(store) => *guard = Some(store),
            Err(e) => self.telemetry.error(format!(
                "Failed to open vector index {}: {}",
                self.path.display(),
                e
            )),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Embeds and stores `chunks` under `ids`. `metadatas` overrides the
    /// chunks' own metadata when given.
    pub fn add(
        &self,
        ids: &[String],
        metadatas: Option<&[Metadata]>,
        chunks: &[Chunk],
    ) -> Result<AddReport, IndexError> {
        let metadata_len = metadatas.map(<[Metadata]>::len).unwrap_or(chunks.len());
        if ids.len() != chunks.len() || metadata_len != chunks.len() {
            return Err(IndexError::LengthMismatch {
                ids: ids.len(),
                metadatas: metadata_len,
                chunks: chunks.len(),
            });
        }

        self.initialize();
        if !self.is_initialized() {
            return Err(IndexError::NotInitialized);
        }

        let mut report = AddReport::default();
        if chunks.is_empty() {
            return Ok(report);
        }

        let total_batches = chunks.len().div_ceil(self.batch_size);
        let pb = output::progress_bar(chunks.len() as u64, self.show_progress, "chunks", "Embedding");

        for (batch_no, start) in (0..chunks.len()).step_by(self.batch_size).enumerate() {
            let end = (start + self.batch_size).min(chunks.len());
            pb.set_message(format!("batch {}/{}", batch_no + 1, total_batches));
            report.batches += 1;

            let batch_meta = metadatas.map(|m| &m[start..end]);
            match self.insert_batch(&ids[start..end], batch_meta, &chunks[start..end]) {
                Ok(n) => report.inserted += n,
                Err(e) => {
                    self.telemetry.error(format!(
                        "Failed to insert batch {}/{}: {}",
                        batch_no + 1,
                        total_batches,
                        e
                    ));
                    report.skipped.push(Skipped::new(
                        Stage::Index,
                        format!("batch {}/{}", batch_no + 1, total_batches),
                        e,
                    ));
                }
            }
            pb.inc((end - start) as u64);
        }
        pb.finish_and_clear();

        self.telemetry.info(format!(
            "Inserted {} of {} chunks into {} in {} batches",
            report.inserted,
            chunks.len(),
            self.path.display(),
            report.batches
        ));
        Ok(report)
    }

    /// Embeds one batch with a single provider call and writes it in one transaction.
    pub fn insert_batch(
        &self,
        ids: &[String],
        metadatas: Option<&[Metadata]>,
        chunks: &[Chunk],
    ) -> Result<usize, IndexError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.provider.embed_documents(&texts)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let records: Vec<VectorRecord<'_>> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| VectorRecord {
                id: &ids[i],
                text: &chunk.content,
                metadata: metadatas.map(|m| &m[i]).unwrap_or(&chunk.metadata),
                embedding: &vectors[i],
            })
            .collect();

        let mut guard = self.lock();
        let store = guard.as_mut().ok_or(IndexError::NotInitialized)?;
        store.upsert(&records, self.provider.model_id())
    }

    /// Up to `k` chunks most similar to `query`, best first. Never fails:
    /// an uninitialised index, a blank query, `k == 0` or any backend error
    /// yields an empty result.
    pub fn search(&self, query: &str, k: usize) -> RetrievalResult {
        if query.trim().is_empty() || k == 0 {
            return Vec::new();
        }
        if !self.is_initialized() {
            self.telemetry.warn("Vector index is not initialized");
            return Vec::new();
        }

        let embedding = match self.provider.embed_query(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                self.telemetry.error(format!("Error embedding query: {}", e));
                return Vec::new();
            }
        };

        let guard = self.lock();
        let Some(store) = guard.as_ref() else {
            return Vec::new();
        };
        match store.dimension() {
            Ok(Some(dimension)) if dimension != embedding.len() => {
                self.telemetry.error(format!(
                    "Query embedding has dimension {} but {} stores dimension {}; \
                     was the embedding model changed? Re-ingest the corpus",
                    embedding.len(),
                    self.path.display(),
                    dimension
                ));
                return Vec::new();
            }
            Ok(_) => {}
            Err(e) => {
                self.telemetry.error(format!("Error searching vector index: {}", e));
                return Vec::new();
            }
        }

        match store.search_similar(&embedding, k) {
            Ok(outcome) => {
                if outcome.unreadable > 0 || outcome.bad_metadata > 0 {
                    self.telemetry.warn(format!(
                        "Vector index {} has damaged rows: {} unreadable, {} with invalid metadata",
                        self.path.display(),
                        outcome.unreadable,
                        outcome.bad_metadata
                    ));
                }
                outcome.hits
            }
            Err(e) => {
                self.telemetry.error(format!("Error searching vector index: {}", e));
                Vec::new()
            }
        }
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64, IndexError> {
        self.lock()
            .as_ref()
            .ok_or(IndexError::NotInitialized)?
            .count()
    }

    /// Removes every record from the collection.
    pub fn clear(&self) -> Result<(), IndexError> {
        self.lock()
            .as_mut()
            .ok_or(IndexError::NotInitialized)?
            .clear()
    }
}
