// src/process/batch.rs
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

use super::rollover::{append_with_rollover, Disposition, RolloverState};
use super::utils::{data_row_count, non_blank_lines};
use crate::fetch::BatchDecoder;

/// Most VINs the batch endpoint accepts in one call.
pub const MAX_BATCH_SIZE: usize = 50;

/// Separator between VINs in one request payload.
pub const VIN_DELIMITER: &str = ";";

/// Characters of a response echoed into warnings.
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct BatchSettings<'a> {
    pub batch_size: usize,
    pub output_base: &'a Path,
    pub max_file_bytes: u64,
}

/// Totals for one run over the identifier list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub decoded_rows: usize,
    pub written_files: BTreeSet<PathBuf>,
    pub batches: usize,
    pub failed_batches: usize,
    /// Writer state after the last batch.
    pub state: RolloverState,
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}

/// Decode `vins` in groups of `settings.batch_size`, one request at a time,
/// appending each response to the rolling output files.
///
/// A failed or unusable batch is logged and skipped; the run always finishes.
#[instrument(level = "info", skip_all, fields(vins = vins.len(), batch_size = settings.batch_size))]
pub async fn decode_in_batches<D: BatchDecoder + ?Sized>(
    decoder: &D,
    vins: &[String],
    settings: &BatchSettings<'_>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    if vins.is_empty() {
        warn!("no VINs provided to decode");
        return summary;
    }

    let batch_size = settings.batch_size.max(1);
    let num_batches = vins.len().div_ceil(batch_size);
    let mut state = RolloverState::default();

    for (i, batch) in vins.chunks(batch_size).enumerate() {
        let batch_no = i + 1;
        summary.batches += 1;
        info!("processing batch {}/{} ({} VINs)", batch_no, num_batches, batch.len());

        let payload = batch.join(VIN_DELIMITER);
        let raw = match decoder.decode_batch(&payload).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(batch = batch_no, "decode request failed: {}", e);
                summary.failed_batches += 1;
                continue;
            }
        };

        let Some(row_count) = data_row_count(&raw) else {
            warn!(
                batch = batch_no,
                response = %preview(&raw),
                "batch returned no results or empty CSV"
            );
            continue;
        };

        let outcome =
            append_with_rollover(&raw, settings.output_base, state, settings.max_file_bytes);
        state = outcome.state.clone();

        if outcome.path.is_file() {
            summary.written_files.insert(outcome.path.clone());
        }

        match &outcome.disposition {
            Disposition::HeaderMismatch { .. } => {
                warn!(batch = batch_no, "batch dropped: header mismatch");
            }
            Disposition::WriteFailed(_) => {
                warn!(batch = batch_no, "batch dropped: write failed");
            }
            _ => {}
        }
        summary.decoded_rows += outcome.data_rows();

        if row_count == 0 {
            info!(
                batch = batch_no,
                response = %preview(&raw),
                "batch returned CSV data with only a header line"
            );
            if state.header.is_none() {
                state.header = non_blank_lines(&raw).first().map(|h| h.to_string());
            }
        }
    }

    if summary.decoded_rows == 0 {
        warn!("no data was successfully decoded from any batch");
    }
    summary.state = state;
    summary
}
