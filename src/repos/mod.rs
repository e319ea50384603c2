//! Cloned repositories on disk.
//!
//! A repository is a directory directly under the repositories directory
//! that contains a `.git` marker. Nothing else is tracked: listing,
//! resolution of generation targets and deletion all look at the filesystem
//! at call time.

pub mod git;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::process::{RunLimits, ToolError};
use crate::types::{InvalidName, RepoName, Target};

/// Version-control marker that makes a directory count as a repository.
pub const VCS_MARKER: &str = ".git";

/// Errors from repository management.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository {0} not found")]
    NotFound(RepoName),

    #[error("repository {0} already exists")]
    AlreadyExists(RepoName),

    #[error("{0}")]
    InvalidName(#[from] InvalidName),

    /// `git clone` failed.
    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: ToolError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Repositories of a generation target, split by whether they exist now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Repositories with a version-control marker, in name order.
    pub present: Vec<RepoName>,

    /// Named repositories that are missing or lack the marker.
    pub missing: Vec<RepoName>,
}

/// The directory holding all cloned repositories.
#[derive(Debug, Clone)]
pub struct RepoStore {
    repos_dir: PathBuf,
}

impl RepoStore {
    pub fn new(repos_dir: impl Into<PathBuf>) -> Self {
        RepoStore {
            repos_dir: repos_dir.into(),
        }
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    pub fn repo_path(&self, name: &RepoName) -> PathBuf {
        self.repos_dir.join(name.as_str())
    }

    /// Returns true if `<repos>/<name>/.git` exists.
    pub fn is_repository(&self, name: &RepoName) -> bool {
        self.repo_path(name).join(VCS_MARKER).exists()
    }

    /// Lists every repository, sorted by name.
    ///
    /// Hidden and symlinked directories count like any other. Names that are
    /// not valid UTF-8 are ignored. A missing repositories directory lists as
    /// empty.
    pub fn list(&self) -> io::Result<Vec<RepoName>> {
        let read_dir = match fs::read_dir(&self.repos_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut repos = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            // Follows symlinks, so a linked checkout counts.
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(name) = RepoName::parse(name) else {
                continue;
            };
            if self.is_repository(&name) {
                repos.push(name);
            }
        }

        repos.sort();
        Ok(repos)
    }

    /// Resolves a generation target against the current directory contents.
    pub fn resolve(&self, target: &Target) -> io::Result<Resolution> {
        match target {
            Target::All => Ok(Resolution {
                present: self.list()?,
                missing: Vec::new(),
            }),
            Target::Named(names) => {
                let (present, missing): (Vec<_>, Vec<_>) = names
                    .iter()
                    .cloned()
                    .partition(|name| self.is_repository(name));
                Ok(Resolution { present, missing })
            }
        }
    }

    /// Clones `url` into a directory named after its last path segment.
    pub async fn clone_repo(&self, url: &str, limits: &RunLimits) -> Result<RepoName, RepoError> {
        let name = RepoName::from_url(url)?;
        let dest = self.repo_path(&name);
        if dest.exists() {
            return Err(RepoError::AlreadyExists(name));
        }

        fs::create_dir_all(&self.repos_dir)?;
        info!(url = %url, repo = %name, "Cloning repository");

        // git runs inside the repositories directory, so the destination is
        // the bare name.
        git::clone_command(&self.repos_dir, url, Path::new(name.as_str()))
            .run(limits)
            .await
            .map_err(|source| {
                warn!(url = %url, error = %source, "Clone failed");
                RepoError::Clone {
                    url: url.to_string(),
                    source,
                }
            })?;

        debug!(repo = %name, path = %dest.display(), "Clone complete");
        Ok(name)
    }

    /// Deletes a repository's directory tree.
    pub fn delete(&self, name: &RepoName) -> Result<(), RepoError> {
        let path = self.repo_path(name);
        if !path.exists() {
            return Err(RepoError::NotFound(name.clone()));
        }
        fs::remove_dir_all(&path)?;
        info!(repo = %name, "Deleted repository");
        Ok(())
    }
}
