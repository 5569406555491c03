// SPDX-License-Identifier: MIT OR Apache-2.0

//! ragpipe - Retrieval-augmented generation pipeline
//!
//! Command-line driver over the library's ingestion and query pipelines.

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing with RAGPIPE_LOG env var (e.g., RAGPIPE_LOG=debug ragpipe query "...")
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("RAGPIPE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let compact = cli.compact;

    match cli.command {
        Commands::Ingest {
            corpus,
            backend,
            progress,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::ingest::run(config, &corpus, &backend, progress, format, compact)?;
        }
        Commands::Query {
            question,
            backend,
            sources,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::query::run(config, &question, &backend, sources, format, compact)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ragpipe", &mut std::io::stdout());
        }
    }

    Ok(())
}
