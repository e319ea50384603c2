//! Render endpoints: list, delete, start.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, ApiError, optional_json};
use crate::config::Settings;
use crate::logs::COMBINED_LOG_NAME;
use crate::render::{
    RenderInfo, RenderOptions, RenderOutcome, RenderPlan, Renderer, delete_render, list_renders,
};

/// Body of `POST /api/renders/start`. The log defaults to the combined log.
#[derive(Debug, Default, Deserialize)]
pub struct StartRenderRequest {
    #[serde(default)]
    pub log: Option<String>,

    #[serde(default)]
    pub options: RenderOptions,
}

pub async fn list(State(app): State<AppState>) -> Result<Json<Vec<RenderInfo>>, ApiError> {
    Ok(Json(list_renders(&app.config().renders_dir())?))
}

pub async fn delete(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    delete_render(&app.config().renders_dir(), &name)?;
    Ok(Json(json!({ "status": "success" })))
}

/// Renders a log to video and waits for the encoder to finish.
pub async fn start(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<RenderOutcome>, ApiError> {
    let request: StartRenderRequest = optional_json(&body)?;
    let config = app.config();

    let log_name = request.log.as_deref().unwrap_or(COMBINED_LOG_NAME);
    let log_path = config.log_store().resolve(log_name)?;
    let settings = Settings::load_or_init(&config.settings_path())?;
    let plan = RenderPlan::new(
        log_path,
        &config.renders_dir(),
        request.options,
        &settings.default_render_settings,
    )?;

    let renderer = Renderer {
        gource_bin: config.gource_bin.clone(),
        ffmpeg_bin: config.ffmpeg_bin.clone(),
    };
    Ok(Json(renderer.render(&plan, &app.limits()).await?))
}
