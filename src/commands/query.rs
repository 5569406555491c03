// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ragpipe query`

use anyhow::Result;
use ragpipe::config::Config;
use ragpipe::output::{colorize_heading, colorize_path, colorize_score, print_json, use_colors};
use ragpipe::pipeline::Pipeline;
use ragpipe::telemetry::Telemetry;

use crate::cli::OutputFormat;

pub fn run(
    config: Config,
    question: &str,
    backend: &str,
    show_sources: bool,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let pipeline = Pipeline::new(config, &Telemetry::new());
    let response = pipeline.query(question, backend);

    match format {
        OutputFormat::Json => print_json(&response, compact)?,
        OutputFormat::Text => {
            println!("{}", response.answer);
            if show_sources && !response.sources.is_empty() {
                let color = use_colors();
                println!("\n{}", colorize_heading("Sources:", color));
                for source in &response.sources {
                    let location = match source.metadata.get("start_index") {
                        Some(start) => format!("{}@{}", source.source(), start),
                        None => source.source().to_string(),
                    };
                    println!(
                        "  {} {}",
                        colorize_score(source.score, color),
                        colorize_path(&location, color)
                    );
                }
            }
        }
    }

    Ok(())
}
