//! Validated names that end up as path components.
//!
//! Repository names, log names and render names all come from HTTP requests
//! and are joined onto data directories, so they must be a single, visible
//! path component.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A name that cannot be used as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} name: {name:?}")]
pub struct InvalidName {
    pub kind: &'static str,
    pub name: String,
}

/// Checks that `name` is safe to join onto a directory.
///
/// Rejects empty names, path separators, NUL bytes, and names starting with a
/// dot (hidden files, `.` and `..`).
pub fn validate_component(kind: &'static str, name: &str) -> Result<(), InvalidName> {
    let unsafe_name = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);

    if unsafe_name {
        return Err(InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Name of a cloned repository directly under the repositories directory.
///
/// Unlike log and render names, hidden names such as `.dotfiles` are
/// allowed; only `.`, `..`, separators and NUL are rejected. Ordered by
/// string so batches run in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName(String);

impl RepoName {
    pub fn parse(name: impl Into<String>) -> Result<Self, InvalidName> {
        let name = name.into();
        let unsafe_name = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if unsafe_name {
            return Err(InvalidName {
                kind: "repository",
                name,
            });
        }
        Ok(RepoName(name))
    }

    /// Derives the clone directory name from a remote URL.
    ///
    /// Takes the last `/`-separated segment and drops a trailing `.git`:
    /// `https://github.com/acme/widgets.git` becomes `widgets`.
    pub fn from_url(url: &str) -> Result<Self, InvalidName> {
        let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
        let name = last.strip_suffix(".git").unwrap_or(last);
        Self::parse(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RepoName {
    type Error = InvalidName;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        RepoName::parse(s)
    }
}

impl From<RepoName> for String {
    fn from(name: RepoName) -> Self {
        name.0
    }
}
