//! Per-repository log generation.
//!
//! For each repository of a [`Target`]:
//! 1. Run the converter inside the repository, writing raw records to a
//!    hidden temp file
//! 2. Prefix every record's path with `/<repo>`
//! 3. Atomically replace `<logs>/<repo>.txt`
//!
//! A batch stops at the first converter failure. Logs written for earlier
//! repositories stay in place. Named repositories that do not exist are
//! skipped and reported.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{LogError, LogStore, PathLocks, run_blocking};
use crate::persistence::write_atomic;
use crate::process::{RunLimits, ToolCommand};
use crate::repos::RepoStore;
use crate::types::{RepoName, Target, prefix_record};

/// The history-to-event-log converter (gource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    program: PathBuf,
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Converter {
            program: program.into(),
        }
    }

    /// `<program> --output-custom-log <dest>` with the repository as cwd.
    pub fn command(&self, repo_dir: &Path, dest: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("--output-custom-log")
            .arg(dest)
            .current_dir(repo_dir)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Converter::new("gource")
    }
}

/// Outcome of a generation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Logs written, in processing order.
    pub log_files: Vec<PathBuf>,

    /// Named repositories that were missing or had no version-control marker,
    /// and repositories whose log would overwrite the combined log.
    pub skipped: Vec<RepoName>,

    /// Requested names that cannot name a repository at all.
    pub invalid: Vec<String>,
}

/// Splits a raw log into lines, dropping a trailing `\r` from each.
pub(crate) fn raw_lines(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    raw.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Prefixes every record of a raw converter log with `/<repo>`.
///
/// Records with fewer than two fields carry no path and are dropped. Every
/// kept record ends with a newline. Bytes outside the path prefix are copied
/// unchanged, valid UTF-8 or not.
pub fn rewrite_raw_log(raw: &[u8], repo: &RepoName) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + raw.len() / 8);
    for line in raw_lines(raw) {
        if let Some(record) = prefix_record(line, repo) {
            out.extend_from_slice(&record);
            out.push(b'\n');
        }
    }
    out
}

/// Generates logs for every repository of `target`.
#[instrument(skip_all, fields(all = target.is_all()))]
pub async fn generate_logs(
    repos: &RepoStore,
    logs: &LogStore,
    converter: &Converter,
    target: &Target,
    limits: &RunLimits,
    locks: &PathLocks,
) -> Result<GenerationReport, LogError> {
    let resolution = repos
        .resolve(target)
        .map_err(LogError::io_at(repos.repos_dir()))?;

    let mut report = GenerationReport::default();
    for repo in resolution.missing {
        warn!(repo = %repo, "Skipping repository without version-control marker");
        report.skipped.push(repo);
    }

    let (reserved, present): (Vec<_>, Vec<_>) = resolution
        .present
        .into_iter()
        .partition(|repo| logs.collides_with_combined(repo));
    for repo in reserved {
        warn!(repo = %repo, combined = %logs.combined_name(), "Skipping repository named like the combined log");
        report.skipped.push(repo);
    }

    info!(count = present.len(), "Generating repository logs");
    for repo in &present {
        let path = generate_repo_log(repos, logs, converter, repo, limits, locks).await?;
        report.log_files.push(path);
    }

    info!(
        generated = report.log_files.len(),
        skipped = report.skipped.len(),
        "Log generation complete"
    );
    Ok(report)
}

/// Generates the log of a single repository.
pub async fn generate_repo_log(
    repos: &RepoStore,
    logs: &LogStore,
    converter: &Converter,
    repo: &RepoName,
    limits: &RunLimits,
    locks: &PathLocks,
) -> Result<PathBuf, LogError> {
    let logs_dir = logs.logs_dir().to_path_buf();
    run_blocking(move || fs::create_dir_all(&logs_dir).map_err(LogError::io_at(&logs_dir))).await?;

    let log_path = logs.log_path(repo);
    let _guard = locks.lock(&log_path).await;

    // The converter runs inside the repository, so it needs an absolute path.
    let raw_path = logs.raw_path(repo);
    let raw_path = std::path::absolute(&raw_path).map_err(LogError::io_at(&raw_path))?;

    debug!(repo = %repo, raw = %raw_path.display(), "Running converter");
    if let Err(source) = converter
        .command(&repos.repo_path(repo), &raw_path)
        .run(limits)
        .await
    {
        warn!(repo = %repo, error = %source, "Converter failed");
        let _ = tokio::fs::remove_file(&raw_path).await;
        return Err(LogError::ToolFailed {
            repo: repo.clone(),
            source,
        });
    }

    let bytes = {
        let repo = repo.clone();
        let log_path = log_path.clone();
        run_blocking(move || {
            let raw = fs::read(&raw_path).map_err(LogError::io_at(&raw_path));
            let _ = fs::remove_file(&raw_path);
            let rewritten = rewrite_raw_log(&raw?, &repo);
            write_atomic(&log_path, &rewritten).map_err(LogError::io_at(&log_path))?;
            Ok(rewritten.len())
        })
        .await?
    };

    info!(
        repo = %repo,
        path = %log_path.display(),
        bytes,
        "Repository log written"
    );
    Ok(log_path)
}
