// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and the offline hashing implementation.

use crate::errors::EmbeddingError;

/// Trait for embedding providers.
///
/// Implementations must return one vector per input, in input order, all of
/// the same dimensionality. Errors are returned as-is; retrying is the
/// caller's decision.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Checks that the provider can be called at all, e.g. that its
    /// credentials are present. Performs no network request.
    fn check_ready(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }

    /// Generates embeddings for the given texts.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generates an embedding for a search query.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut result = self.embed_documents(&[text.to_string()])?;
        match result.len() {
            1 => result
                .pop()
                .ok_or(EmbeddingError::CountMismatch {
                    expected: 1,
                    actual: 0,
                }),
            actual => Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual,
            }),
        }
    }
}

/// Checks that a backend answered with exactly one vector per input.
pub(crate) fn ensure_count(
    vectors: Vec<Vec<f32>>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Offline provider: feature-hashed bag of lower-cased alphanumeric tokens.
///
/// Texts sharing words get positive cosine similarity, which is enough for
/// development corpora and tests. Needs no network or model files.
pub struct HashingProvider {
    model: String,
    dimension: usize,
}

impl HashingProvider {
    /// Creates a new hashing provider with specified dimension.
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            model: format!("hashing-d{}", dimension),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in tokens(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let bucket = u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) % self.dimension as u64;
            vector[bucket as usize] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl EmbeddingProvider for HashingProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}
