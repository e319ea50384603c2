//! User-editable settings persisted as `config.json`.
//!
//! Settings are loaded from disk for every request that needs them and passed
//! down by value; nothing caches them in memory, so an edit through
//! `PUT /api/config` is visible to the next request.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::persistence::write_atomic;

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render defaults applied when a render request leaves a field out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    pub resolution: String,
    pub seconds_per_day: f64,
    pub hide: Vec<String>,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        RenderDefaults {
            resolution: "1920x1080".to_string(),
            seconds_per_day: 8.57,
            hide: ["progress", "mouse", "filenames", "root"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Contents of `config.json`.
///
/// Unknown keys are kept so clients can store their own preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github_api_key: String,

    #[serde(default)]
    pub default_render_settings: RenderDefaults,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replaces the settings file atomically.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)?;
        Ok(())
    }

    /// Loads the settings, writing the defaults first if the file is missing.
    pub fn load_or_init(path: &Path) -> Result<Settings, SettingsError> {
        match Settings::load(path) {
            Ok(settings) => Ok(settings),
            Err(SettingsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                let settings = Settings::default();
                settings.save(path)?;
                info!(path = %path.display(), "Wrote default settings");
                Ok(settings)
            }
            Err(e) => Err(e),
        }
    }
}
