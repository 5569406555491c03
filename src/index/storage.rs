// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-based storage for chunk vectors.
//!
//! One database file per backend directory; several named collections may
//! share it. Vectors are stored as little-endian f32 blobs and searched by
//! brute-force cosine similarity.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::document::{Metadata, ScoredChunk};
use crate::errors::IndexError;

type Result<T> = std::result::Result<T, IndexError>;

/// A record ready to be written.
#[derive(Debug, Clone, Copy)]
pub struct VectorRecord<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub metadata: &'a Metadata,
    pub embedding: &'a [f32],
}

/// Result of [`ChunkStore::search_similar`].
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Best matches first.
    pub hits: Vec<ScoredChunk>,
    /// Rows skipped because they could not be decoded.
    pub unreadable: usize,
    /// Rows returned with empty metadata because theirs did not parse.
    pub bad_metadata: usize,
}

/// SQLite storage for one collection.
pub struct ChunkStore {
    conn: Connection,
    path: PathBuf,
    collection: String,
}

impl ChunkStore {
    /// Opens or creates the store at `path` in WAL mode.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))?;

        let store = Self {
            conn,
            path,
            collection: collection.to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );

            CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )?;
        Ok(())
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Dimensionality recorded on first insert.
    pub fn dimension(&self) -> Result<Option<usize>> {
        Ok(self
            .get_meta("dimension")?
            .and_then(|v| v.parse::<usize>().ok()))
    }

    /// Inserts or replaces records in a single transaction. The first write to
    /// an empty collection records its dimensionality and `model_id`; later
    /// writes of another dimensionality are rejected.
    pub fn upsert(&mut self, records: &[VectorRecord<'_>], model_id: &str) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let expected = match self.dimension()? {
            Some(dim) => dim,
            None => first.embedding.len(),
        };
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (collection, id, text, metadata, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(collection, id) DO UPDATE SET
                    text = excluded.text,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    created_at = excluded.created_at
                "#,
            )?;
            for record in records {
                let metadata = serde_json::Value::Object(record.metadata.clone()).to_string();
                stmt.execute(params![
                    self.collection,
                    record.id,
                    record.text,
                    metadata,
                    embedding_to_blob(record.embedding),
                    created_at,
                ])?;
            }

            let mut meta = tx.prepare(
                "INSERT OR IGNORE INTO meta (collection, key, value) VALUES (?1, ?2, ?3)",
            )?;
            meta.execute(params![self.collection, "dimension", expected.to_string()])?;
            meta.execute(params![self.collection, "model", model_id])?;
        }
        tx.commit()?;

        Ok(records.len())
    }

    /// Returns up to `top_k` records by descending cosine similarity.
    ///
    /// Rows that cannot be decoded are left out, and rows whose metadata is
    /// not a JSON object are kept with empty metadata; both are counted in
    /// the outcome.
    pub fn search_similar(&self, query_embedding: &[f32], top_k: usize) -> Result<SearchOutcome> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, metadata, embedding FROM chunks WHERE collection = ?1",
        )?;
        let rows = stmt.query_map(params![self.collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut outcome = SearchOutcome::default();
        for row in rows {
            let Ok((id, text, metadata, blob)) = row else {
                outcome.unreadable += 1;
                continue;
            };
            let metadata = match serde_json::from_str::<Metadata>(&metadata) {
                Ok(metadata) => metadata,
                Err(_) => {
                    outcome.bad_metadata += 1;
                    Metadata::new()
                }
            };
            outcome.hits.push(ScoredChunk {
                id,
                text,
                metadata,
                score: cosine_similarity(query_embedding, &blob_to_embedding(&blob)),
            });
        }

        // Sort by score (descending)
        outcome.hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        outcome.hits.truncate(top_k);

        Ok(outcome)
    }

    /// Counts records in the collection.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Deletes every record and the recorded dimensionality.
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE collection = ?1", params![self.collection])?;
        tx.execute("DELETE FROM meta WHERE collection = ?1", params![self.collection])?;
        tx.commit()?;
        Ok(())
    }

    /// Gets metadata value by key.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE collection = ?1 AND key = ?2",
                params![self.collection, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Converts an embedding vector to a compact blob.
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Converts a blob back to an embedding vector.
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Computes cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
