// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-k retrieval over a vector index.

use std::sync::Arc;

use crate::document::RetrievalResult;
use crate::index::VectorIndex;

/// Chunks returned per query by default.
pub const DEFAULT_TOP_K: usize = 4;

/// A read-only retrieval step.
pub trait Retrieve: Send + Sync {
    fn retrieve(&self, query: &str) -> RetrievalResult;
}

/// Retrieves the `top_k` chunks most similar to a query.
pub struct Retriever {
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, top_k: usize) -> Self {
        Self { index, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

impl Retrieve for Retriever {
    fn retrieve(&self, query: &str) -> RetrievalResult {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.index.search(query, self.top_k)
    }
}
