//! Video rendering of a log through gource and ffmpeg.
//!
//! gource replays the log and streams PPM frames on stdout; ffmpeg reads them
//! from stdin and encodes an H.264 mp4 into the renders directory:
//!
//! ```text
//! gource <log> --seconds-per-day S --viewport WxH --output-ppm-stream - [--hide ITEM]...
//!   | ffmpeg -y -r FPS -f image2pipe -vcodec ppm -i - -vcodec libx264 -preset P
//!            -pix_fmt yuv420p -crf 18 -bf 2 <renders>/<name>.mp4
//! ```
//!
//! Both processes share one [`RunLimits`] budget.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RenderDefaults;
use crate::process::{RunLimits, ToolCommand, ToolError, check_status};
use crate::types::{InvalidName, validate_component};

/// Extension of rendered videos.
pub const RENDER_EXTENSION: &str = "mp4";

const DEFAULT_OUTPUT_FILENAME: &str = "gource-render";
const DEFAULT_FPS: u32 = 60;
const DEFAULT_QUALITY_PRESET: &str = "medium";

/// Errors from rendering and render management.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    InvalidName(#[from] InvalidName),

    #[error("render {0} not found")]
    NotFound(String),

    #[error("invalid render option: {0}")]
    InvalidOption(String),

    #[error("render failed: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Render request options. Absent fields use the persisted defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub output_filename: Option<String>,
    pub resolution: Option<String>,
    pub seconds_per_day: Option<f64>,
    pub fps: Option<u32>,
    pub hide_items: Option<Vec<String>>,
    pub quality_preset: Option<String>,
}

/// Fully resolved render parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub log_path: PathBuf,
    pub output_path: PathBuf,
    pub resolution: String,
    pub seconds_per_day: f64,
    pub fps: u32,
    pub hide_items: Vec<String>,
    pub quality_preset: String,
}

impl RenderPlan {
    /// Merges request options over the persisted defaults and validates them.
    pub fn new(
        log_path: PathBuf,
        renders_dir: &Path,
        options: RenderOptions,
        defaults: &RenderDefaults,
    ) -> Result<Self, RenderError> {
        let output_filename = options
            .output_filename
            .unwrap_or_else(|| DEFAULT_OUTPUT_FILENAME.to_string());
        validate_component("render", &output_filename)?;

        let resolution = options
            .resolution
            .unwrap_or_else(|| defaults.resolution.clone());
        if !is_resolution(&resolution) {
            return Err(RenderError::InvalidOption(format!(
                "resolution must be WIDTHxHEIGHT, got {resolution:?}"
            )));
        }

        let seconds_per_day = options.seconds_per_day.unwrap_or(defaults.seconds_per_day);
        if !(seconds_per_day.is_finite() && seconds_per_day > 0.0) {
            return Err(RenderError::InvalidOption(format!(
                "seconds per day must be positive, got {seconds_per_day}"
            )));
        }

        let fps = options.fps.unwrap_or(DEFAULT_FPS);
        if fps == 0 {
            return Err(RenderError::InvalidOption("fps must be positive".to_string()));
        }

        Ok(RenderPlan {
            log_path,
            output_path: renders_dir.join(format!("{}.{}", output_filename, RENDER_EXTENSION)),
            resolution,
            seconds_per_day,
            fps,
            hide_items: options
                .hide_items
                .unwrap_or_else(|| defaults.hide.clone()),
            quality_preset: options
                .quality_preset
                .unwrap_or_else(|| DEFAULT_QUALITY_PRESET.to_string()),
        })
    }

    /// File name of the encoded artifact.
    pub fn render_file(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn gource_command(&self, gource_bin: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(gource_bin)
            .arg(&self.log_path)
            .arg("--seconds-per-day")
            .arg(self.seconds_per_day.to_string())
            .arg("--viewport")
            .arg(&self.resolution)
            .arg("--output-ppm-stream")
            .arg("-");
        for item in &self.hide_items {
            cmd = cmd.arg("--hide").arg(item);
        }
        cmd
    }

    pub fn ffmpeg_command(&self, ffmpeg_bin: &Path) -> ToolCommand {
        ToolCommand::new(ffmpeg_bin)
            .args(["-y", "-r"])
            .arg(self.fps.to_string())
            .args(["-f", "image2pipe", "-vcodec", "ppm", "-i", "-"])
            .args(["-vcodec", "libx264", "-preset"])
            .arg(&self.quality_preset)
            .args(["-pix_fmt", "yuv420p", "-crf", "18", "-bf", "2"])
            .arg(&self.output_path)
    }
}

fn is_resolution(s: &str) -> bool {
    let Some((w, h)) = s.split_once('x') else {
        return false;
    };
    matches!((w.parse::<u32>(), h.parse::<u32>()), (Ok(w), Ok(h)) if w > 0 && h > 0)
}

/// Result of a completed render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutcome {
    pub render_file: String,
}

/// Tool binaries used for rendering.
#[derive(Debug, Clone)]
pub struct Renderer {
    pub gource_bin: PathBuf,
    pub ffmpeg_bin: PathBuf,
}

impl Renderer {
    /// Runs gource piped into ffmpeg and waits for both.
    ///
    /// A failure of either process fails the render. When gource exits with
    /// an error code its failure is reported first, since it usually explains
    /// ffmpeg's; when gource was killed by a broken pipe, ffmpeg's is.
    pub async fn render(&self, plan: &RenderPlan, limits: &RunLimits) -> Result<RenderOutcome, RenderError> {
        if let Some(parent) = plan.output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let gource_cmd = plan.gource_command(&self.gource_bin);
        let ffmpeg_cmd = plan.ffmpeg_command(&self.ffmpeg_bin);
        let pipeline = format!("{} | {}", gource_cmd.display(), ffmpeg_cmd.display());
        info!(log = %plan.log_path.display(), output = %plan.output_path.display(), "Starting render");

        let mut gource = gource_cmd.to_command().spawn().map_err(|source| ToolError::Spawn {
            command: gource_cmd.display(),
            source,
        })?;
        let frames: Stdio = gource
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("gource stdout was not captured"))?
            .try_into()?;

        // The Command holds the pipe's read end until dropped; it must go
        // before waiting or gource never sees the encoder exit.
        let ffmpeg = {
            let mut cmd = ffmpeg_cmd.to_command();
            cmd.stdin(frames).stdout(Stdio::null());
            cmd.spawn()
        }
        .map_err(|source| ToolError::Spawn {
            command: ffmpeg_cmd.display(),
            source,
        })?;

        let (gource_out, ffmpeg_out) = limits
            .enforce(&pipeline, async {
                let (g, f) = tokio::join!(gource.wait_with_output(), ffmpeg.wait_with_output());
                Ok::<_, io::Error>((g?, f?))
            })
            .await?;

        let gource_result = check_status(
            &gource_cmd.display(),
            gource_out.status,
            &String::from_utf8_lossy(&gource_out.stderr),
        );
        let ffmpeg_result = check_status(
            &ffmpeg_cmd.display(),
            ffmpeg_out.status,
            &String::from_utf8_lossy(&ffmpeg_out.stderr),
        )
        .inspect_err(|e| warn!(error = %e, "Encoder failed"));

        // A gource killed by a signal (SIGPIPE) is a symptom of the encoder
        // exiting; its own exit code is a cause.
        if gource_out.status.code().is_some() {
            gource_result?;
            ffmpeg_result?;
        } else {
            ffmpeg_result?;
            gource_result?;
        }

        info!(output = %plan.output_path.display(), "Render complete");
        Ok(RenderOutcome {
            render_file: plan.render_file(),
        })
    }
}

/// A rendered video in the renders directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderInfo {
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Lists `*.mp4` renders, newest first.
pub fn list_renders(renders_dir: &Path) -> Result<Vec<RenderInfo>, RenderError> {
    let read_dir = match fs::read_dir(renders_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut renders = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RENDER_EXTENSION) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        renders.push(RenderInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            modified: DateTime::<Utc>::from(metadata.modified()?),
            size: metadata.len(),
        });
    }

    renders.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(renders)
}

/// Deletes one render by file name.
pub fn delete_render(renders_dir: &Path, name: &str) -> Result<(), RenderError> {
    validate_component("render", name)?;
    let path = renders_dir.join(name);
    if !path.is_file() {
        return Err(RenderError::NotFound(name.to_string()));
    }
    fs::remove_file(&path)?;
    info!(render = %name, "Deleted render");
    Ok(())
}
