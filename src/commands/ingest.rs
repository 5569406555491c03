// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ragpipe ingest`

use anyhow::{Context, Result};
use colored::Colorize;
use ragpipe::config::Config;
use ragpipe::output::{colorize_path, colorize_warning, print_json, use_colors};
use ragpipe::pipeline::Pipeline;
use ragpipe::telemetry::Telemetry;
use std::path::Path;

use crate::cli::OutputFormat;

pub fn run(
    config: Config,
    corpus: &Path,
    backend: &str,
    progress: bool,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let pipeline = Pipeline::new(config, &Telemetry::new()).with_progress(progress);
    let report = pipeline
        .ingest(corpus, backend)
        .with_context(|| format!("Failed to ingest {}", corpus.display()))?;

    match format {
        OutputFormat::Json => print_json(&report, compact)?,
        OutputFormat::Text => {
            let color = use_colors();
            println!(
                "{} Ingested {} chunks from {} documents ({} backend, {} batches)",
                if color { "✓".green().to_string() } else { "✓".to_string() },
                report.chunks_ingested,
                report.documents_loaded,
                report.backend,
                report.batches
            );
            if !report.skipped.is_empty() {
                println!(
                    "{}",
                    colorize_warning(&format!("Skipped {} items:", report.skipped.len()), color)
                );
                for skipped in &report.skipped {
                    println!(
                        "  [{}] {}: {}",
                        skipped.stage,
                        colorize_path(&skipped.item, color),
                        skipped.reason
                    );
                }
            }
        }
    }

    Ok(())
}
