//! Durable file writes for logs and settings.
//!
//! All on-disk state is plain files read and written wholesale. The combined
//! log, per-repository logs and `config.json` are replaced with
//! write-to-temp-then-rename so concurrent readers and crashes never observe a
//! half-written file.

pub mod atomic;

pub use atomic::{fsync_dir, fsync_file, temp_path_for, write_atomic};
