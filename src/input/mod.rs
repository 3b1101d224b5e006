// src/input/mod.rs
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs::File, io, path::Path};
use thiserror::Error;
use tracing::{error, info, warn};

/// 17 characters, no I, O or Q.
static VIN_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").expect("VIN regex should compile"));

#[derive(Debug, Error)]
pub enum InputError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file {0} is empty")]
    Empty(String),

    #[error("file {0} has no columns")]
    NoColumns(String),

    #[error("no VINs found in column '{column}'")]
    NoIdentifiers { column: String },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Read every non-empty value of `column` from the CSV at `path`, in file order.
/// Falls back to the first column when `column` is not among the headers.
pub fn read_vins<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<String>, InputError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => InputError::NotFound(display.clone()),
        _ => InputError::Io(e),
    })?;
    if file.metadata()?.len() == 0 {
        return Err(InputError::Empty(display));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(InputError::NoColumns(display));
    }

    let (col_idx, col_name) = match headers.iter().position(|h| h == column) {
        Some(idx) => (idx, column.to_string()),
        None => {
            let first = headers.get(0).unwrap_or_default().to_string();
            warn!(
                wanted = column,
                using = %first,
                "VIN column not found, using the first column"
            );
            (0, first)
        }
    };

    let mut vins = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(value) = record.get(col_idx) {
            if !value.is_empty() {
                vins.push(value.to_string());
            }
        }
    }

    if vins.is_empty() {
        return Err(InputError::NoIdentifiers { column: col_name });
    }

    let odd = vins.iter().filter(|v| !looks_like_vin(v)).count();
    if odd > 0 {
        warn!(count = odd, "some identifiers do not look like 17-character VINs");
    }

    Ok(vins)
}

/// Like [`read_vins`], but logs the failure and yields an empty list.
pub fn load_vins<P: AsRef<Path>>(path: P, column: &str) -> Vec<String> {
    let path = path.as_ref();
    match read_vins(path, column) {
        Ok(vins) => {
            info!(count = vins.len(), path = %path.display(), "read VINs");
            vins
        }
        Err(e) => {
            error!(path = %path.display(), "reading VINs failed: {}", e);
            Vec::new()
        }
    }
}

pub fn looks_like_vin(candidate: &str) -> bool {
    VIN_SHAPE.is_match(&candidate.to_ascii_uppercase())
}
