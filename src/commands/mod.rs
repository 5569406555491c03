// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations

pub mod ingest;
pub mod query;

use anyhow::Result;
use ragpipe::config::Config;
use std::path::Path;

/// Explicit `--config` files must parse; otherwise the usual lookup applies.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::load()),
    }
}
