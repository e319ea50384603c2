//! Repository endpoints: list, clone, delete.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, ApiError, optional_json};
use crate::types::RepoName;

#[derive(Debug, Default, Deserialize)]
pub struct CloneRequest {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn list_repositories(State(app): State<AppState>) -> Result<Json<Vec<RepoName>>, ApiError> {
    Ok(Json(app.config().repo_store().list()?))
}

/// Clones `{"url": ...}` into the repositories directory.
///
/// # Response
///
/// - 200 OK with `{"status": "success", "repository": "<name>"}`
/// - 400 Bad Request if the URL is missing or the repository already exists
/// - 500 Internal Server Error if git fails, 504 if it times out
pub async fn clone_repository(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: CloneRequest = optional_json(&body)?;
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Repository URL is required".to_string()))?;

    let name = app
        .config()
        .repo_store()
        .clone_repo(url.trim(), &app.limits())
        .await?;
    Ok(Json(json!({ "status": "success", "repository": name })))
}

pub async fn delete_repository(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let name = RepoName::parse(name)?;
    app.config().repo_store().delete(&name)?;
    Ok(Json(json!({ "status": "success" })))
}
