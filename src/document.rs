// SPDX-License-Identifier: MIT OR Apache-2.0

//! Records that flow through the pipeline: documents, chunks, search hits and
//! per-item skip reports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// String-keyed metadata carried from loader to index.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the path of the originating file.
pub const SOURCE_KEY: &str = "source";

/// Metadata key holding a chunk's character offset inside its document.
pub const START_INDEX_KEY: &str = "start_index";

/// A unit of loaded text plus its source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    /// Creates a document whose `source` metadata is `source`.
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Adds one metadata field.
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Source path, or an empty string when the loader did not record one.
    pub fn source(&self) -> &str {
        source_of(&self.metadata)
    }
}

/// A bounded slice of a document, ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Empty until the ingestion pipeline assigns one.
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn source(&self) -> &str {
        source_of(&self.metadata)
    }

    /// Character offset of this chunk inside its parent document.
    pub fn start_index(&self) -> Option<u64> {
        self.metadata.get(START_INDEX_KEY).and_then(Value::as_u64)
    }
}

/// One retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine similarity, higher is better.
    pub score: f32,
}

impl ScoredChunk {
    pub fn source(&self) -> &str {
        source_of(&self.metadata)
    }
}

/// Ranked search hits, best first.
pub type RetrievalResult = Vec<ScoredChunk>;

fn source_of(metadata: &Metadata) -> &str {
    metadata
        .get(SOURCE_KEY)
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Pipeline stage that skipped an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Split,
    Index,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Split => write!(f, "split"),
            Stage::Index => write!(f, "index"),
        }
    }
}

/// An item that a stage could not process, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub stage: Stage,
    /// File path, document source, or batch label.
    pub item: String,
    pub reason: String,
}

impl Skipped {
    pub fn new(stage: Stage, item: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            stage,
            item: item.into(),
            reason: reason.to_string(),
        }
    }
}
