//! Which repositories a generation batch covers.

use std::collections::BTreeSet;

use super::RepoName;

/// The repositories a log generation request targets.
///
/// An empty name list means every repository, resolved against the
/// repositories directory when the batch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every directory that currently carries a version-control marker.
    All,

    /// Exactly these repositories, processed in name order.
    Named(BTreeSet<RepoName>),
}

impl Target {
    /// Builds a target from a request's name list.
    pub fn from_names(names: impl IntoIterator<Item = RepoName>) -> Self {
        let names: BTreeSet<RepoName> = names.into_iter().collect();
        if names.is_empty() {
            Target::All
        } else {
            Target::Named(names)
        }
    }

    /// Builds a target from unvalidated request names, returning the names
    /// that cannot name a repository alongside it.
    ///
    /// Only an empty request means every repository. A request whose names
    /// are all invalid targets nothing.
    pub fn parse_names(names: impl IntoIterator<Item = String>) -> (Self, Vec<String>) {
        let mut valid = BTreeSet::new();
        let mut invalid = Vec::new();
        let mut requested = false;
        for name in names {
            requested = true;
            match RepoName::parse(&name) {
                Ok(repo) => {
                    valid.insert(repo);
                }
                Err(_) => invalid.push(name),
            }
        }

        if requested {
            (Target::Named(valid), invalid)
        } else {
            (Target::All, invalid)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Target::All)
    }
}
