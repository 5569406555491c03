// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document loader
//!
//! Walks a corpus directory and converts `.txt`, `.md`, `.csv` and `.json`
//! files into [`Document`]s. Files of any other type are skipped with a
//! warning; a file that fails to load never aborts the walk.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::LoaderConfig;
use crate::document::{Document, Skipped, Stage};
use crate::errors::LoadError;
use crate::output;
use crate::telemetry::Telemetry;

/// How a supported file is turned into documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Markdown,
    Csv,
    Json,
}

static HANDLERS: Lazy<HashMap<&'static str, FileKind>> = Lazy::new(|| {
    let mut handlers = HashMap::new();
    handlers.insert("txt", FileKind::Text);
    handlers.insert("md", FileKind::Markdown);
    handlers.insert("csv", FileKind::Csv);
    handlers.insert("json", FileKind::Json);
    handlers
});

/// Looks up the handler for `path` by lower-cased extension.
pub fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    HANDLERS.get(ext.as_str()).copied()
}

/// Documents loaded from a corpus plus the files that were skipped.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<Skipped>,
}

pub struct DocumentLoader {
    max_file_bytes: u64,
    show_progress: bool,
    telemetry: Telemetry,
}

impl DocumentLoader {
    pub fn new(config: &LoaderConfig, telemetry: &Telemetry) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes(),
            show_progress: false,
            telemetry: telemetry.scoped("loader"),
        }
    }

    /// Shows a progress bar while files are read.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Loads every supported file under `root`, in sorted walk order.
    pub fn load(&self, root: &Path) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        if !root.is_dir() {
            let reason = format!("{} is not a readable directory", root.display());
            self.telemetry.error(format!("Failed to load documents: {}", reason));
            outcome
                .skipped
                .push(Skipped::new(Stage::Load, root.display().to_string(), reason));
            return outcome;
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let item = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    self.telemetry.warn(format!("Skipping {}: {}", item, e));
                    outcome.skipped.push(Skipped::new(Stage::Load, item, e));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            if file_kind(&path).is_some() {
                files.push(path);
            } else {
                let err = LoadError::Unsupported { path: path.clone() };
                self.telemetry.warn(format!("Unsupported file type: {}", path.display()));
                outcome
                    .skipped
                    .push(Skipped::new(Stage::Load, path.display().to_string(), err));
            }
        }

        if files.is_empty() {
            self.telemetry
                .warn(format!("No supported documents found in {}", root.display()));
            return outcome;
        }

        let pb = output::progress_bar(files.len() as u64, self.show_progress, "files", "Loading");
        let results: Vec<(PathBuf, Result<Vec<Document>, LoadError>)> = files
            .into_par_iter()
            .map(|path| {
                pb.set_message(path.display().to_string());
                let result = self.load_file(&path);
                pb.inc(1);
                (path, result)
            })
            .collect();
        pb.finish_and_clear();

        for (path, result) in results {
            match result {
                Ok(documents) => outcome.documents.extend(documents),
                Err(e) => {
                    self.telemetry.error(format!("Error loading {}: {}", path.display(), e));
                    outcome
                        .skipped
                        .push(Skipped::new(Stage::Load, path.display().to_string(), e));
                }
            }
        }

        self.telemetry.info(format!(
            "Loaded {} documents from {}",
            outcome.documents.len(),
            root.display()
        ));
        outcome
    }

    /// Loads a single file with the handler for its extension.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Document>, LoadError> {
        let kind = file_kind(path).ok_or_else(|| LoadError::Unsupported {
            path: path.to_path_buf(),
        })?;

        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > self.max_file_bytes {
            return Err(LoadError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_bytes,
            });
        }
        let bytes = std::fs::read(path).map_err(io_err)?;
        let source = path.display().to_string();

        match kind {
            FileKind::Text | FileKind::Markdown => Ok(vec![Document::new(
                String::from_utf8_lossy(&bytes),
                source,
            )]),
            FileKind::Csv => csv_documents(&bytes, &source).map_err(|e| LoadError::Csv {
                path: path.to_path_buf(),
                source: e,
            }),
            FileKind::Json => json_documents(&bytes, &source).map_err(|e| LoadError::Json {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

/// One document per data row; content is `header: value` lines.
fn csv_documents(bytes: &[u8], source: &str) -> Result<Vec<Document>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let content = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| format!("{}: {}", h, v))
            .collect::<Vec<_>>()
            .join("\n");
        documents.push(Document::new(content, source).with_meta("row", row));
    }
    Ok(documents)
}

/// A top-level array gives one document per element; anything else one document.
fn json_documents(bytes: &[u8], source: &str) -> Result<Vec<Document>, serde_json::Error> {
    let value: Value = serde_json::from_slice(bytes)?;
    let documents = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Document::new(json_text(item), source).with_meta("seq_num", i + 1))
            .collect(),
        other => vec![Document::new(json_text(other), source)],
    };
    Ok(documents)
}

fn json_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
