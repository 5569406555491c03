// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document splitter.
//!
//! Turns loaded documents into chunks sized for the target embedding backend.
//! Markdown documents are first cut into header sections; every section (or
//! whole non-markdown document) then goes through the recursive
//! length-bounded splitter.

pub mod markdown;
pub mod recursive;

use serde_json::Value;
use std::collections::HashMap;

use crate::config::SplitterConfig;
use crate::document::{Chunk, Document, Metadata, Skipped, Stage, START_INDEX_KEY};
use crate::errors::{Error, Result, SplitError};
use crate::telemetry::Telemetry;
use recursive::RecursiveSplitter;

/// Chunk size for backends without an entry in the table.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Chunk size for the `hf` backend.
pub const HF_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Maximum document size in bytes.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 2_000_000;

/// Maps a backend id to its chunk size.
#[derive(Debug, Clone)]
pub struct ChunkSizeTable {
    sizes: HashMap<String, usize>,
    default: usize,
}

impl Default for ChunkSizeTable {
    fn default() -> Self {
        let mut sizes = HashMap::new();
        sizes.insert("hf".to_string(), HF_CHUNK_SIZE);
        Self {
            sizes,
            default: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkSizeTable {
    /// Built-in table with the configured overrides applied on top.
    pub fn from_config(config: &SplitterConfig) -> Self {
        let mut table = Self::default();
        table.default = config.default_chunk_size();
        table
            .sizes
            .extend(config.chunk_sizes.iter().map(|(k, v)| (k.clone(), *v)));
        table
    }

    pub fn chunk_size(&self, backend_id: &str) -> usize {
        self.sizes.get(backend_id).copied().unwrap_or(self.default)
    }
}

/// Configuration for the document splitter.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks.
    pub chunk_overlap: usize,
    /// Documents above this many bytes are skipped.
    pub max_document_bytes: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl ChunkConfig {
    /// Creates a new ChunkConfig with the specified parameters.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        })
    }

    /// Chunk config for `backend_id` as configured in `[splitter]`.
    pub fn for_backend(config: &SplitterConfig, backend_id: &str) -> Result<Self> {
        let size = ChunkSizeTable::from_config(config).chunk_size(backend_id);
        Ok(Self::new(size, config.chunk_overlap())?
            .with_max_document_bytes(config.max_document_bytes()))
    }

    /// Sets the maximum document size.
    pub fn with_max_document_bytes(mut self, size: usize) -> Self {
        self.max_document_bytes = size;
        self
    }
}

/// Chunks produced from a batch of documents plus the documents skipped.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<Skipped>,
}

/// Splits documents into chunks.
pub struct DocumentSplitter {
    config: ChunkConfig,
    splitter: RecursiveSplitter,
    telemetry: Telemetry,
}

impl DocumentSplitter {
    pub fn new(config: ChunkConfig, telemetry: &Telemetry) -> Self {
        Self {
            splitter: RecursiveSplitter::new(config.chunk_size, config.chunk_overlap),
            config,
            telemetry: telemetry.scoped("splitter"),
        }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Splits every document. Documents that fail are logged, reported in
    /// `skipped` and contribute no chunks.
    pub fn split(&self, documents: &[Document]) -> SplitOutcome {
        let mut outcome = SplitOutcome::default();
        for document in documents {
            match self.split_document(document) {
                Ok(chunks) => outcome.chunks.extend(chunks),
                Err(e) => {
                    self.telemetry
                        .error(format!("Error splitting document {}: {}", document.source(), e));
                    outcome
                        .skipped
                        .push(Skipped::new(Stage::Split, document.source(), e));
                }
            }
        }
        self.telemetry.debug(format!(
            "Split {} documents into {} chunks",
            documents.len(),
            outcome.chunks.len()
        ));
        outcome
    }

    /// Splits one document. Chunks carry the document metadata plus
    /// `start_index`, and header fields for markdown.
    pub fn split_document(
        &self,
        document: &Document,
    ) -> std::result::Result<Vec<Chunk>, SplitError> {
        if document.content.len() > self.config.max_document_bytes {
            return Err(SplitError::TooLarge {
                source_path: document.source().to_string(),
                size: document.content.len(),
                limit: self.config.max_document_bytes,
            });
        }

        if !is_markdown(document.source()) {
            return Ok(self.chunk_text(&document.content, 0, &document.metadata));
        }

        let mut chunks = Vec::new();
        for section in markdown::sections(&document.content) {
            let mut metadata = document.metadata.clone();
            for (level, title) in &section.headers {
                metadata.insert(format!("header_{}", level), Value::String(title.clone()));
            }
            if !section.headers.is_empty() {
                metadata.insert("header_path".to_string(), Value::String(section.header_path()));
            }
            chunks.extend(self.chunk_text(section.text, section.start, &metadata));
        }
        Ok(chunks)
    }

    fn chunk_text(&self, text: &str, base: usize, metadata: &Metadata) -> Vec<Chunk> {
        self.splitter
            .split(text)
            .into_iter()
            .map(|span| {
                let mut metadata = metadata.clone();
                metadata.insert(START_INDEX_KEY.to_string(), Value::from(base + span.start));
                Chunk {
                    id: String::new(),
                    content: span.text.to_string(),
                    metadata,
                }
            })
            .collect()
    }
}

fn is_markdown(source: &str) -> bool {
    source.to_lowercase().ends_with(".md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Level;

    fn splitter(size: usize, overlap: usize) -> DocumentSplitter {
        DocumentSplitter::new(ChunkConfig::new(size, overlap).unwrap(), &Telemetry::new())
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::new(500, 10).is_ok());
        assert!(ChunkConfig::new(20, 20).is_err());
        assert!(ChunkConfig::new(20, 30).is_err());
        assert!(ChunkConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_chunk_size_table() {
        let table = ChunkSizeTable::default();
        assert_eq!(table.chunk_size("hf"), 500);
        assert_eq!(table.chunk_size("gemini"), 1000);
        assert_eq!(table.chunk_size("hashing"), 1000);

        let mut config = SplitterConfig::default();
        config.chunk_sizes.insert("gemini".to_string(), 800);
        config.default_chunk_size = Some(700);
        let table = ChunkSizeTable::from_config(&config);
        assert_eq!(table.chunk_size("hf"), 500);
        assert_eq!(table.chunk_size("gemini"), 800);
        assert_eq!(table.chunk_size("other"), 700);
    }

    #[test]
    fn test_for_backend_rejects_bad_overlap() {
        let config = SplitterConfig {
            chunk_overlap: Some(600),
            ..Default::default()
        };
        assert!(ChunkConfig::for_backend(&config, "hf").is_err());
        assert!(ChunkConfig::for_backend(&config, "gemini").is_ok());
    }

    #[test]
    fn test_forty_char_document_is_one_chunk() {
        let content = "Admissions are open until the 1st of May";
        assert_eq!(content.chars().count(), 40);
        let doc = Document::new(content, "a.txt");

        let chunks = splitter(500, 10).split_document(&doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, content);
        assert_eq!(chunks[0].start_index(), Some(0));
        assert_eq!(chunks[0].source(), "a.txt");
    }

    #[test]
    fn test_chunks_respect_bound_and_offsets() {
        let content = (0..60)
            .map(|i| format!("Sentence number {} talks about enrolment.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let doc = Document::new(content.clone(), "long.txt");
        let chunks = splitter(120, 20).split_document(&doc).unwrap();
        assert!(chunks.len() > 1);

        let chars: Vec<char> = content.chars().collect();
        for chunk in &chunks {
            let len = chunk.content.chars().count();
            assert!(len <= 120);
            let start = chunk.start_index().unwrap() as usize;
            let slice: String = chars[start..start + len].iter().collect();
            assert_eq!(slice, chunk.content);
        }
    }

    #[test]
    fn test_markdown_headers_become_metadata() {
        let content = "# Admissions\nApply online.\n## Deadlines\nMay 1st.\n";
        let doc = Document::new(content, "guide.MD");
        let chunks = splitter(500, 10).split_document(&doc).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Apply online.");
        assert_eq!(chunks[0].metadata["header_1"], "Admissions");
        assert!(chunks[0].metadata.get("header_2").is_none());
        assert_eq!(chunks[1].metadata["header_path"], "Admissions > Deadlines");
        assert_eq!(chunks[1].source(), "guide.MD");

        let start = chunks[1].start_index().unwrap() as usize;
        assert_eq!(&content[start..start + "May 1st.".len()], "May 1st.");
    }

    #[test]
    fn test_oversized_document_is_skipped() {
        let telemetry = Telemetry::capturing();
        let config = ChunkConfig::new(100, 10).unwrap().with_max_document_bytes(8);
        let splitter = DocumentSplitter::new(config, &telemetry);
        let docs = vec![
            Document::new("short", "ok.txt"),
            Document::new("definitely too long", "big.txt"),
        ];

        let outcome = splitter.split(&docs);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].item, "big.txt");
        assert_eq!(outcome.skipped[0].stage, Stage::Split);
        assert!(telemetry.messages(Level::Error)[0].contains("big.txt"));
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        let chunks = splitter(100, 10)
            .split_document(&Document::new("   \n", "blank.txt"))
            .unwrap();
        assert!(chunks.is_empty());
    }
}
