use anyhow::Result;
use std::{collections::BTreeSet, env, path::PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};
use vindecode::{
    config::Config,
    fetch::VpicClient,
    input::load_vins,
    process::{decode_in_batches, strip_blank_lines_all, BatchSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();
    info!("starting VIN decoding");

    // ─── 2) configuration ────────────────────────────────────────────
    // usage: vindecode [INPUT_CSV]
    let cfg = Config::from_env(env::args().nth(1))?;
    info!(
        input = %cfg.input_path.display(),
        column = %cfg.vin_column,
        output = %cfg.output_base.display(),
        max_file_bytes = cfg.max_file_bytes,
        batch_size = cfg.batch_size,
        "config loaded"
    );

    // ─── 3) read VINs ────────────────────────────────────────────────
    let vins = load_vins(&cfg.input_path, &cfg.vin_column);
    if vins.is_empty() {
        warn!("no VINs found or error reading input; exit");
        return Ok(());
    }

    // ─── 4) decode in batches ────────────────────────────────────────
    let client = VpicClient::new(cfg.decode_url.clone(), cfg.request_timeout)?;
    let settings = BatchSettings {
        batch_size: cfg.batch_size,
        output_base: &cfg.output_base,
        max_file_bytes: cfg.max_file_bytes,
    };
    let summary = decode_in_batches(&client, &vins, &settings).await;

    if summary.decoded_rows == 0 {
        warn!(
            batches = summary.batches,
            failed = summary.failed_batches,
            "nothing was decoded and saved; exit"
        );
        return Ok(());
    }

    let files: Vec<PathBuf> = summary.written_files.iter().cloned().collect();
    info!(
        decoded = summary.decoded_rows,
        batches = summary.batches,
        failed = summary.failed_batches,
        files = %display_list(&summary.written_files),
        "decoding finished"
    );

    // ─── 5) strip blank rows from everything we touched ──────────────
    strip_blank_lines_all(&files);

    info!("all done");
    Ok(())
}

fn display_list(paths: &BTreeSet<PathBuf>) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
