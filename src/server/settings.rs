//! Settings endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::{Value, json};

use super::{AppState, ApiError};
use crate::config::Settings;

/// Returns the persisted settings, creating the defaults on first use.
pub async fn get_settings(State(app): State<AppState>) -> Result<Json<Settings>, ApiError> {
    let settings = Settings::load_or_init(&app.config().settings_path())?;
    Ok(Json(settings))
}

/// Replaces the persisted settings with the request body.
pub async fn put_settings(State(app): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let settings: Settings = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid settings: {e}")))?;
    settings.save(&app.config().settings_path())?;
    Ok(Json(json!({ "status": "success" })))
}
