//! Combination of per-repository logs into the combined log.
//!
//! 1. Read every input log and collect its non-empty lines
//! 2. Sort the lines ([`SortOrder`])
//! 3. Drop exact duplicate lines, first occurrence wins
//! 4. Atomically replace the combined log
//!
//! Lines are opaque byte strings here: two records differing only in
//! trailing whitespace are distinct, and non-UTF-8 bytes pass through. The
//! default order is a whole-line byte-wise sort, which is chronological only
//! while timestamps share a digit count.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::generate::raw_lines;
use super::{LogError, LogStore, PathLocks, run_blocking};
use crate::persistence::write_atomic;
use crate::types::timestamp_of;

/// How combined records are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Whole-line byte-wise string order. `100|...` sorts before `50|...`.
    #[default]
    Lexicographic,

    /// Numeric timestamp order; ties and unparsable timestamps fall back to
    /// whole-line order, with unparsable timestamps last.
    Chronological,
}

impl SortOrder {
    fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            SortOrder::Lexicographic => a.cmp(b),
            SortOrder::Chronological => {
                let key = |line: &[u8]| {
                    let ts = timestamp_of(line);
                    (ts.is_none(), ts.unwrap_or_default())
                };
                key(a).cmp(&key(b)).then_with(|| a.cmp(b))
            }
        }
    }
}

/// Outcome of a combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombineReport {
    pub combined_log: PathBuf,

    /// Number of per-repository logs read.
    pub input_files: usize,

    /// Non-empty records read across all inputs.
    pub total_lines: usize,

    /// Records written after deduplication.
    pub unique_lines: usize,
}

/// Sorts and deduplicates lines. Empty lines are dropped.
pub fn combine_lines<'a>(mut lines: Vec<&'a [u8]>, order: SortOrder) -> Vec<&'a [u8]> {
    lines.retain(|line| !line.is_empty());
    lines.sort_by(|a, b| order.compare(a, b));

    let mut seen = HashSet::with_capacity(lines.len());
    lines.retain(|line| seen.insert(*line));
    lines
}

/// Combines every per-repository log into the combined log.
///
/// Blocking; see [`combine_logs_locked`] for the async, serialized entry
/// point.
#[instrument(skip_all, fields(order = ?order))]
pub fn combine_logs(logs: &LogStore, order: SortOrder) -> Result<CombineReport, LogError> {
    let inputs = logs.input_logs()?;
    debug!(inputs = inputs.len(), "Reading repository logs");

    // Each file is split on its own so a missing trailing newline cannot
    // join two records.
    let mut contents = Vec::with_capacity(inputs.len());
    for path in &inputs {
        contents.push(fs::read(path).map_err(LogError::io_at(path))?);
    }
    let lines: Vec<&[u8]> = contents
        .iter()
        .flat_map(|content| raw_lines(content))
        .filter(|line| !line.is_empty())
        .collect();
    let total_lines = lines.len();

    let unique = combine_lines(lines, order);

    let mut out = Vec::with_capacity(unique.iter().map(|l| l.len() + 1).sum());
    for line in &unique {
        out.extend_from_slice(line);
        out.push(b'\n');
    }

    let combined_log = logs.combined_path();
    write_atomic(&combined_log, &out).map_err(LogError::io_at(&combined_log))?;

    info!(
        path = %combined_log.display(),
        input_files = inputs.len(),
        total_lines,
        unique_lines = unique.len(),
        "Combined log written"
    );

    Ok(CombineReport {
        combined_log,
        input_files: inputs.len(),
        total_lines,
        unique_lines: unique.len(),
    })
}

/// Runs [`combine_logs`] on the blocking pool while holding the combined
/// log's path lock.
pub async fn combine_logs_locked(
    logs: LogStore,
    order: SortOrder,
    locks: &PathLocks,
) -> Result<CombineReport, LogError> {
    let _guard = locks.lock(&logs.combined_path()).await;
    run_blocking(move || combine_logs(&logs, order)).await
}
