//! Per-path mutual exclusion for log writers.
//!
//! Two requests combining into the same combined log, or regenerating the
//! same repository log, would otherwise race on one file. Each output path
//! gets its own async mutex; unrelated paths never wait on each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A registry of async locks keyed by output path.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `path`. Released when the guard drops.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(path.to_path_buf()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_path_is_exclusive() {
        let locks = PathLocks::new();
        let path = Path::new("/logs/ACombinedLog.txt");

        let guard = locks.lock(path).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(path)).await;
        assert!(blocked.is_err(), "second writer must wait");

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.lock(path)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_paths_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/logs/a.txt")).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(Path::new("/logs/b.txt"))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn clones_share_the_registry() {
        let locks = PathLocks::new();
        let other = locks.clone();
        let path = Path::new("/logs/shared.txt");

        let _guard = locks.lock(path).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), other.lock(path)).await;
        assert!(blocked.is_err());
    }
}
