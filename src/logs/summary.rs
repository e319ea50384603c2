//! Metadata about a log file: entry count, time span, size.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::LogError;
use crate::types::EventRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub name: String,
    pub entry_count: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_date: Option<DateTime<Utc>>,
    pub last_date: Option<DateTime<Utc>>,
    pub file_size: u64,
}

/// Summarizes the log at `path`.
///
/// First and last refer to file order, which is chronological for logs the
/// converter produced and string order for the combined log.
pub fn summarize_log(path: &Path) -> Result<LogSummary, LogError> {
    // Author names are not guaranteed UTF-8; only the timestamps matter here.
    let raw = fs::read(path).map_err(LogError::io_at(path))?;
    let content = String::from_utf8_lossy(&raw);
    let file_size = fs::metadata(path).map_err(LogError::io_at(path))?.len();

    let mut entries = content.lines().filter(|l| !l.trim().is_empty());
    let first = entries.next();
    let mut entry_count = usize::from(first.is_some());
    let mut last = first;
    for line in entries {
        entry_count += 1;
        last = Some(line);
    }

    let first_timestamp = first.and_then(|l| EventRecord::new(l).timestamp());
    let last_timestamp = last.and_then(|l| EventRecord::new(l).timestamp());

    Ok(LogSummary {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        entry_count,
        first_timestamp,
        last_timestamp,
        first_date: first_timestamp.and_then(|t| DateTime::from_timestamp(t, 0)),
        last_date: last_timestamp.and_then(|t| DateTime::from_timestamp(t, 0)),
        file_size,
    })
}
