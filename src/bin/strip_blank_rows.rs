// src/bin/strip_blank_rows.rs
//
// Re-run the blank-row cleanup over existing output files.
// usage: strip_blank_rows [GLOB]   (default: decoded_vins_output*.csv)

use anyhow::{Context, Result};
use glob::glob;
use std::{env, path::PathBuf};
use tracing::{info, warn};
use vindecode::{config::DEFAULT_OUTPUT_BASE, process::strip_blank_lines_all};

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let pattern = env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{}*.csv", DEFAULT_OUTPUT_BASE));
    let paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    if paths.is_empty() {
        warn!(%pattern, "no files matched");
        return Ok(());
    }

    info!(count = paths.len(), %pattern, "cleaning files");
    strip_blank_lines_all(&paths);
    Ok(())
}
