//! Event records of the gource custom log format.
//!
//! One record per line, pipe-delimited:
//!
//! ```text
//! <unix-timestamp>|<path>|<change-type>[|<extra>...]
//! ```
//!
//! Sorting and deduplication treat a record as an opaque line. Only path
//! prefixing and the chronological order look inside it.

use super::RepoName;

/// Field separator of the log format.
pub const FIELD_SEPARATOR: char = '|';

/// A borrowed view over one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord<'a> {
    line: &'a str,
}

impl<'a> EventRecord<'a> {
    pub fn new(line: &'a str) -> Self {
        EventRecord { line }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    /// The raw timestamp field.
    pub fn timestamp_field(&self) -> &'a str {
        self.line
            .split(FIELD_SEPARATOR)
            .next()
            .unwrap_or(self.line)
    }

    /// The timestamp as Unix seconds, if it parses.
    pub fn timestamp(&self) -> Option<i64> {
        timestamp_of(self.line.as_bytes())
    }

    /// The path field, absent for records with a single field.
    pub fn path(&self) -> Option<&'a str> {
        self.line.split(FIELD_SEPARATOR).nth(1)
    }
}

/// The timestamp of a raw record line as Unix seconds, if it parses.
///
/// Works on bytes so records carrying non-UTF-8 author names still sort.
pub fn timestamp_of(line: &[u8]) -> Option<i64> {
    let field = line
        .split(|&b| b == FIELD_SEPARATOR as u8)
        .next()
        .unwrap_or(line);
    std::str::from_utf8(field).ok()?.trim().parse().ok()
}

/// Rewrites the path field of a raw record to live under `/<repo>`.
///
/// `100|/src/main.rs|A` for repository `widgets` becomes
/// `100|/widgets/src/main.rs|A`. The path is prefixed verbatim, so a path
/// without a leading slash is glued onto the name. The other fields are
/// copied byte for byte. Records with fewer than two fields have no path and
/// yield `None`.
pub fn prefix_record(line: &[u8], repo: &RepoName) -> Option<Vec<u8>> {
    let split = line.iter().position(|&b| b == FIELD_SEPARATOR as u8)?;
    let (timestamp, rest) = line.split_at(split);

    let mut rewritten = Vec::with_capacity(line.len() + repo.as_str().len() + 1);
    rewritten.extend_from_slice(timestamp);
    rewritten.push(FIELD_SEPARATOR as u8);
    rewritten.push(b'/');
    rewritten.extend_from_slice(repo.as_str().as_bytes());
    rewritten.extend_from_slice(&rest[1..]);
    Some(rewritten)
}
