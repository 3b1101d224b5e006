// src/process/mod.rs
pub mod batch;
pub mod cleanup;
pub mod rollover;
pub mod utils;

pub use batch::{decode_in_batches, BatchSettings, RunSummary};
pub use cleanup::{strip_blank_lines, strip_blank_lines_all, CleanupOutcome};
pub use rollover::{append_with_rollover, output_path, AppendOutcome, Disposition, RolloverState};
