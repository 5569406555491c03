// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the pipeline.
//!
//! Component errors are typed so callers can tell a skippable item from a
//! configuration problem. Only [`Error`] crosses the pipeline boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while turning text into vectors.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedding endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Failure of a single language model invocation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

impl ModelError {
    /// True when the underlying HTTP call hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Transport(e) if e.is_timeout())
    }
}

/// Failure while reading one file of the corpus.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file type: {}", path.display())]
    Unsupported { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is {size} bytes, above the {limit} byte limit", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while splitting one document.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("document from {source_path} is {size} bytes, above the {limit} byte limit")]
    TooLarge {
        source_path: String,
        size: usize,
        limit: usize,
    },
}

/// Failure inside the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("embedding has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{ids} ids, {metadatas} metadatas and {chunks} chunks must have equal length")]
    LengthMismatch {
        ids: usize,
        metadatas: usize,
        chunks: usize,
    },
}

/// Pipeline-level failure. Only configuration-class problems end up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown embedding backend '{0}'")]
    UnknownBackend(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to construct embedding provider for '{backend}': {reason}")]
    Provider { backend: String, reason: String },

    #[error("vector index at {} could not be initialized", path.display())]
    IndexUnavailable { path: PathBuf },

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type Result<T> = std::result::Result<T, Error>;
