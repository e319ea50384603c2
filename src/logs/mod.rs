//! Activity log pipeline.
//!
//! Per-repository logs are produced by running the history converter
//! (`gource --output-custom-log`) inside each repository and prefixing every
//! record's path with the repository name. The combiner then merges all of
//! them into one sorted, deduplicated log that rendering consumes.
//!
//! # File Layout
//!
//! ```text
//! <logs_dir>/
//!   <repo>.txt               # one per repository
//!   ACombinedLog.txt         # combined output, excluded from its own inputs
//!   .<repo>.gource.tmp       # raw converter output while generating
//!   .<name>.tmp              # atomic-write temp files
//! ```
//!
//! Only `*.txt` files are logs; temp files are hidden and never match.

pub mod combine;
pub mod generate;
pub mod lock;
pub mod summary;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::process::ToolError;
use crate::types::{InvalidName, RepoName, validate_component};

pub use combine::{CombineReport, SortOrder, combine_lines, combine_logs, combine_logs_locked};
pub use generate::{Converter, GenerationReport, generate_logs, generate_repo_log, rewrite_raw_log};
pub use lock::PathLocks;
pub use summary::{LogSummary, summarize_log};

/// Extension shared by every log file.
pub const LOG_EXTENSION: &str = "txt";

/// File name of the combined log.
pub const COMBINED_LOG_NAME: &str = "ACombinedLog.txt";

/// Errors from log generation, combination and inspection.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("{0}")]
    InvalidName(#[from] InvalidName),

    #[error("log file {0} not found")]
    NotFound(String),

    /// The history converter failed for one repository of a batch.
    #[error("error generating log for {repo}: {source}")]
    ToolFailed {
        repo: RepoName,
        #[source]
        source: ToolError,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A blocking file task panicked or was aborted.
    #[error("background task failed: {0}")]
    Background(String),
}

impl LogError {
    pub(crate) fn io_at(path: &Path) -> impl FnOnce(io::Error) -> LogError + '_ {
        move |source| LogError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Runs filesystem work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, LogError>
where
    F: FnOnce() -> Result<T, LogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LogError::Background(e.to_string()))?
}

/// The logs directory and the naming rules inside it.
#[derive(Debug, Clone)]
pub struct LogStore {
    logs_dir: PathBuf,
    combined_name: String,
}

impl LogStore {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        LogStore {
            logs_dir: logs_dir.into(),
            combined_name: COMBINED_LOG_NAME.to_string(),
        }
    }

    /// Uses a different combined-log file name.
    pub fn with_combined_name(mut self, name: impl Into<String>) -> Self {
        self.combined_name = name.into();
        self
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn combined_name(&self) -> &str {
        &self.combined_name
    }

    pub fn combined_path(&self) -> PathBuf {
        self.logs_dir.join(&self.combined_name)
    }

    /// `<logs>/<repo>.txt`
    pub fn log_path(&self, repo: &RepoName) -> PathBuf {
        self.logs_dir
            .join(format!("{}.{}", repo.as_str(), LOG_EXTENSION))
    }

    /// True if `repo`'s log would land on the combined log.
    pub fn collides_with_combined(&self, repo: &RepoName) -> bool {
        self.log_path(repo) == self.combined_path()
    }

    /// Hidden destination for the converter's unprefixed output.
    pub fn raw_path(&self, repo: &RepoName) -> PathBuf {
        self.logs_dir.join(format!(".{}.gource.tmp", repo.as_str()))
    }

    /// Resolves a client-supplied log name to an existing file.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, LogError> {
        validate_component("log", name)?;
        let path = self.logs_dir.join(name);
        if !path.is_file() {
            return Err(LogError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Names of all `*.txt` logs, combined log included, sorted.
    pub fn list(&self) -> Result<Vec<String>, LogError> {
        let mut names: Vec<String> = self
            .log_files()?
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    /// The per-repository logs the combiner reads: every `*.txt` except the
    /// combined log, in directory iteration order.
    pub fn input_logs(&self) -> Result<Vec<PathBuf>, LogError> {
        Ok(self
            .log_files()?
            .into_iter()
            .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(self.combined_name.as_str()))
            .collect())
    }

    fn log_files(&self) -> Result<Vec<PathBuf>, LogError> {
        let read_dir = match fs::read_dir(&self.logs_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::io_at(&self.logs_dir)(e)),
        };

        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(LogError::io_at(&self.logs_dir))?;
            let path = entry.path();
            let is_log = path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION);
            if is_log && path.is_file() {
                files.push(path);
            }
        }
        Ok(files)
    }
}
