//! Avatar downloading through the external downloader script.
//!
//! The script takes `<output-dir> <email-or-empty> <repos-dir>`. With an
//! email it fetches one avatar; with an empty email it walks every repository
//! under `<repos-dir>`, collects author emails from `git log` and downloads
//! their avatars concurrently. A missing avatar is reported on stdout and
//! skipped; only a script failure fails the request.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::process::{RunLimits, ToolCommand, ToolError};

/// Whose avatars to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarTarget {
    /// A single author email.
    Single(String),

    /// Every author of every repository.
    AllRepositories,
}

/// The downloader script and the interpreter running it.
#[derive(Debug, Clone)]
pub struct AvatarFetcher {
    pub perl_bin: PathBuf,
    pub script: PathBuf,
}

impl AvatarFetcher {
    pub fn command(&self, avatars_dir: &Path, repos_dir: &Path, target: &AvatarTarget) -> ToolCommand {
        let email = match target {
            AvatarTarget::Single(email) => email.as_str(),
            AvatarTarget::AllRepositories => "",
        };
        ToolCommand::new(&self.perl_bin)
            .arg(&self.script)
            .arg(avatars_dir)
            .arg(email)
            .arg(repos_dir)
    }

    /// Runs the downloader and returns its report (stdout).
    pub async fn fetch(
        &self,
        avatars_dir: &Path,
        repos_dir: &Path,
        target: &AvatarTarget,
        limits: &RunLimits,
    ) -> Result<String, ToolError> {
        std::fs::create_dir_all(avatars_dir).map_err(|source| ToolError::Io {
            command: self.script.display().to_string(),
            source,
        })?;

        let output = self.command(avatars_dir, repos_dir, target).run(limits).await?;
        info!(
            avatar_target = ?target,
            downloaded = output.stdout.lines().filter(|l| l.starts_with("Downloaded")).count(),
            "Avatar download finished"
        );
        Ok(output.stdout)
    }
}
