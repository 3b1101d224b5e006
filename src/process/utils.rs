/// Line terminator used for every line written to an output file.
#[cfg(windows)]
pub const LINE_SEP: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEP: &str = "\n";

/// Trim the blob, trim every line, drop lines left empty.
pub fn non_blank_lines(raw: &str) -> Vec<&str> {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Data rows in a raw batch response: non-blank lines minus the header.
/// `None` when there is not even a header line.
pub fn data_row_count(raw: &str) -> Option<usize> {
    non_blank_lines(raw).len().checked_sub(1)
}
