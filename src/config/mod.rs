//! Server configuration.
//!
//! [`ServerConfig`] is built once at startup from environment variables and
//! fixes where data lives and which tool binaries run. User-editable
//! preferences live in [`Settings`], loaded per request.
//!
//! # Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `GOURCE_LOGS_DATA_DIR` | `.` |
//! | `GOURCE_LOGS_LISTEN_ADDR` | `0.0.0.0:5000` |
//! | `GOURCE_LOGS_GOURCE_BIN` | `gource` |
//! | `GOURCE_LOGS_FFMPEG_BIN` | `ffmpeg` |
//! | `GOURCE_LOGS_PERL_BIN` | `perl` |
//! | `GOURCE_LOGS_AVATAR_SCRIPT` | `scripts/avatar_downloader.pl` |
//! | `GOURCE_LOGS_TOOL_TIMEOUT_SECS` | `300` |
//!
//! # Data Layout
//!
//! ```text
//! <data_dir>/
//!   repos/     # cloned repositories
//!   logs/      # per-repository logs + ACombinedLog.txt
//!   avatars/   # downloaded avatars
//!   renders/   # encoded videos
//!   config/    # config.json
//! ```

pub mod settings;

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::logs::{Converter, LogStore};
use crate::process::DEFAULT_TOOL_TIMEOUT_SECS;
use crate::repos::RepoStore;

pub use settings::{RenderDefaults, Settings, SettingsError};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

/// Startup configuration of the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Root of all on-disk state.
    pub data_dir: PathBuf,

    pub listen_addr: SocketAddr,

    /// History-to-log converter and renderer.
    pub gource_bin: PathBuf,

    pub ffmpeg_bin: PathBuf,

    pub perl_bin: PathBuf,

    /// Avatar downloader script run by `perl_bin`.
    pub avatar_script: PathBuf,

    /// Upper bound on any single tool run.
    pub tool_timeout: Duration,
}

impl ServerConfig {
    /// Creates a config rooted at `data_dir` with default tools.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        ServerConfig {
            data_dir: data_dir.into(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            gource_bin: PathBuf::from("gource"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            perl_bin: PathBuf::from("perl"),
            avatar_script: PathBuf::from("scripts/avatar_downloader.pl"),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }

    /// Reads the configuration from `GOURCE_LOGS_*` environment variables.
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::new(".");
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let listen_addr = lookup("GOURCE_LOGS_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .unwrap_or(defaults.listen_addr);
        let timeout_secs = lookup("GOURCE_LOGS_TOOL_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS);

        ServerConfig {
            data_dir: path("GOURCE_LOGS_DATA_DIR", defaults.data_dir.clone()),
            listen_addr,
            gource_bin: path("GOURCE_LOGS_GOURCE_BIN", defaults.gource_bin.clone()),
            ffmpeg_bin: path("GOURCE_LOGS_FFMPEG_BIN", defaults.ffmpeg_bin.clone()),
            perl_bin: path("GOURCE_LOGS_PERL_BIN", defaults.perl_bin.clone()),
            avatar_script: path("GOURCE_LOGS_AVATAR_SCRIPT", defaults.avatar_script.clone()),
            tool_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.data_dir.join("repos")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn avatars_dir(&self) -> PathBuf {
        self.data_dir.join("avatars")
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.data_dir.join("renders")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.data_dir.join("config")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    pub fn repo_store(&self) -> RepoStore {
        RepoStore::new(self.repos_dir())
    }

    pub fn log_store(&self) -> LogStore {
        LogStore::new(self.logs_dir())
    }

    pub fn converter(&self) -> Converter {
        Converter::new(&self.gource_bin)
    }

    /// Creates every data directory.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.repos_dir(),
            self.logs_dir(),
            self.avatars_dir(),
            self.renders_dir(),
            self.config_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
