// src/process/cleanup.rs
use anyhow::{Context, Result};
use std::{fs, io::Write, path::Path};
use tempfile::NamedTempFile;
use tracing::{error, info, instrument};

use super::utils::LINE_SEP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Missing,
    Unchanged,
    Removed(usize),
}

/// Drop whitespace-only lines from `path`, rewriting it only when something
/// was removed. Surviving lines keep their content and end in [`LINE_SEP`].
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn strip_blank_lines<P: AsRef<Path>>(path: P) -> Result<CleanupOutcome> {
    let path = path.as_ref();
    if !path.exists() {
        info!(file = %path.display(), "file not found, skipping cleanup");
        return Ok(CleanupOutcome::Missing);
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let total = content.lines().count();
    let kept: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();

    if kept.len() == total {
        info!(file = %path.display(), "no blank rows found");
        return Ok(CleanupOutcome::Unchanged);
    }

    // Rewrite next to the original so the rename stays on one filesystem.
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    for line in &kept {
        tmp.write_all(line.trim_end_matches('\r').as_bytes())
            .and_then(|_| tmp.write_all(LINE_SEP.as_bytes()))
            .with_context(|| format!("writing cleaned rows for {}", path.display()))?;
    }
    tmp.flush()
        .with_context(|| format!("flushing cleaned rows for {}", path.display()))?;
    let perms = fs::metadata(path)
        .with_context(|| format!("reading permissions of {}", path.display()))?
        .permissions();
    fs::set_permissions(tmp.path(), perms)
        .with_context(|| format!("copying permissions of {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;

    let removed = total - kept.len();
    info!(file = %path.display(), removed, "removed blank rows");
    Ok(CleanupOutcome::Removed(removed))
}

/// Run [`strip_blank_lines`] over every path, logging failures and moving on.
#[instrument(level = "info", skip_all, fields(files = paths.len()))]
pub fn strip_blank_lines_all<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        if let Err(e) = strip_blank_lines(path) {
            error!(file = %path.as_ref().display(), "cleanup failed: {:#}", e);
        }
    }
    info!("post-processing complete");
}
