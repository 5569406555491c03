// SPDX-License-Identifier: MIT OR Apache-2.0

//! ragpipe - Retrieval-augmented generation pipeline library
//!
//! Document loading, splitting, embedding, vector indexing, retrieval and
//! fallback answer generation, shared by the ragpipe CLI.

pub mod config;
pub mod document;
pub mod embedding;
pub mod errors;
pub mod generation;
pub mod http;
pub mod index;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod retriever;
pub mod splitter;
pub mod telemetry;

pub use document::{Chunk, Document, Metadata, RetrievalResult, ScoredChunk};
pub use errors::{Error, Result};
pub use pipeline::{IngestReport, Pipeline, QueryResponse};
