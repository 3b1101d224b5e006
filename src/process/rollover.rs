// src/process/rollover.rs
use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, warn};

use super::utils::{non_blank_lines, LINE_SEP};

/// Size limit used when a caller has no opinion (500 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 500 * 1024 * 1024;

/// Which output file is active and which header it carries.
/// `header` is `None` until something has been written to the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverState {
    pub file_index: usize,
    pub header: Option<String>,
}

/// What happened to the batch handed to [`append_with_rollover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// No non-blank lines in the batch.
    Empty,
    /// Lines were appended. `data_rows` excludes the header line.
    Written {
        header_written: bool,
        data_rows: usize,
    },
    /// Header matched but the batch had no data rows.
    NothingToWrite,
    /// Batch header differs from the file's; batch dropped.
    HeaderMismatch { file_header: String, batch_header: String },
    /// Appending failed; state is what it was before the write.
    WriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// State for the next call.
    pub state: RolloverState,
    /// File targeted by this call, even when nothing was written.
    pub path: PathBuf,
    pub disposition: Disposition,
}

impl AppendOutcome {
    pub fn data_rows(&self) -> usize {
        match self.disposition {
            Disposition::Written { data_rows, .. } => data_rows,
            _ => 0,
        }
    }
}

/// `{base}.csv` for index 0, `{base}{index}.csv` otherwise.
pub fn output_path(base: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    if index > 0 {
        name.push(index.to_string());
    }
    name.push(".csv");
    PathBuf::from(name)
}

fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}

fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Append one raw CSV batch to the active output file.
///
/// The batch's first non-blank line is its header. A fresh file (or one with
/// no recorded header) takes every line; a file whose header matches takes
/// only the data rows; a mismatching batch is dropped. Files above
/// `max_bytes` are rolled over before writing, and a write that pushes the
/// file above `max_bytes` makes the *next* call use a new index.
pub fn append_with_rollover(
    raw: &str,
    base: &Path,
    state: RolloverState,
    max_bytes: u64,
) -> AppendOutcome {
    let mut state = state;
    let mut path = output_path(base, state.file_index);

    if let Some(size) = file_size(&path).filter(|s| *s > max_bytes) {
        info!(
            file = %path.display(),
            size_mb = %format!("{:.2}", to_mib(size)),
            limit_mb = %format!("{:.2}", to_mib(max_bytes)),
            "file already over limit, rolling over before write"
        );
        state.file_index += 1;
        state.header = None;
        path = output_path(base, state.file_index);
        info!(file = %path.display(), "new output file");
    }

    let lines = non_blank_lines(raw);
    let Some((&batch_header, data)) = lines.split_first() else {
        return AppendOutcome {
            state,
            path,
            disposition: Disposition::Empty,
        };
    };

    let (to_write, header_written): (&[&str], bool) = match state.header.as_deref() {
        Some(existing) if path.exists() => {
            if existing != batch_header {
                warn!(
                    file = %path.display(),
                    file_header = existing,
                    batch_header,
                    "batch header does not match file header, skipping batch"
                );
                let disposition = Disposition::HeaderMismatch {
                    file_header: existing.to_string(),
                    batch_header: batch_header.to_string(),
                };
                return AppendOutcome {
                    state,
                    path,
                    disposition,
                };
            }
            (data, false)
        }
        _ => {
            state.header = Some(batch_header.to_string());
            (&lines[..], true)
        }
    };

    if to_write.is_empty() {
        return AppendOutcome {
            state,
            path,
            disposition: Disposition::NothingToWrite,
        };
    }

    if let Err(e) = append_lines(&path, to_write) {
        error!(file = %path.display(), "saving batch failed: {}", e);
        return AppendOutcome {
            state,
            path,
            disposition: Disposition::WriteFailed(e.to_string()),
        };
    }
    let data_rows = to_write.len() - usize::from(header_written);
    debug!(file = %path.display(), data_rows, header_written, "appended batch");

    if let Some(size) = file_size(&path).filter(|s| *s > max_bytes) {
        info!(
            file = %path.display(),
            size_mb = %format!("{:.2}", to_mib(size)),
            "file now over limit, next batch starts a new file"
        );
        state.file_index += 1;
        state.header = None;
    }

    AppendOutcome {
        state,
        path,
        disposition: Disposition::Written {
            header_written,
            data_rows,
        },
    }
}

fn append_lines(path: &Path, lines: &[&str]) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = BufWriter::new(file);
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(LINE_SEP.as_bytes())?;
    }
    out.flush()
}
