//! Crash-safe whole-file writes.
//!
//! Log files and the settings file are always rewritten wholesale. Writes go
//! through a hidden sibling temp file that is fsynced, renamed over the
//! target, and followed by a directory fsync, so a reader sees either the old
//! content or the new content and never a truncated mix.
//!
//! ```text
//! <dir>/.<name>.tmp   # written + fsynced
//! <dir>/<name>        # rename target
//! ```
//!
//! The temp name starts with a dot and ends in `.tmp`, so it never matches the
//! `*.txt` scan the combiner runs over the logs directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Flushes a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Flushes a directory so renames and creations inside it survive a crash.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

/// Returns the hidden temp path used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent_dir(path).join(format!(".{}.tmp", name))
}

/// Replaces the contents of `path` with `bytes` atomically.
///
/// Creates the parent directory if needed. On failure the temp file is
/// removed and the target is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)?;

    let tmp_path = temp_path_for(path);
    let written = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        fsync_file(&file)?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fsync_dir(&parent)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
