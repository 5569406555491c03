// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// ragpipe - Retrieval-augmented generation over a local document corpus
///
/// Ingests .txt, .md, .csv and .json files into a per-backend vector index
/// and answers questions with a primary/fallback language model chain.
#[derive(Parser, Debug)]
#[command(name = "ragpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty formatting)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Configuration file (defaults to .ragpiperc.toml, then ~/.config/ragpipe/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, split, embed and index a corpus directory
    Ingest {
        /// Corpus root directory
        corpus: PathBuf,

        /// Embedding backend: hf (local), gemini (cloud) or hashing
        #[arg(short, long, default_value = "hf")]
        backend: String,

        /// Show progress bars
        #[arg(long)]
        progress: bool,
    },

    /// Answer a question from the indexed corpus
    Query {
        /// The question
        question: String,

        /// Embedding backend whose index is searched
        #[arg(short, long, default_value = "hf")]
        backend: String,

        /// Print retrieved sources after the answer (text format)
        #[arg(long)]
        sources: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
