//! Log endpoints: list, summarize, generate, combine.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::warn;

use super::{AppState, ApiError, optional_json};
use crate::logs::{
    CombineReport, GenerationReport, LogSummary, SortOrder, combine_logs_locked, generate_logs,
    summarize_log,
};
use crate::types::Target;

/// Body of `POST /api/logs/generate`. No names means every repository.
///
/// Names stay unvalidated here so one bad entry cannot reject the batch.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Body of `POST /api/logs/combine`.
#[derive(Debug, Default, Deserialize)]
pub struct CombineRequest {
    #[serde(default)]
    pub order: SortOrder,
}

pub async fn list_logs(State(app): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(app.config().log_store().list()?))
}

pub async fn log_summary(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LogSummary>, ApiError> {
    let path = app.config().log_store().resolve(&name)?;
    Ok(Json(summarize_log(&path)?))
}

/// Generates logs for the named repositories, or all of them.
///
/// Names without a repository are skipped and listed in `skipped`; names
/// that cannot name a repository are listed in `invalid`. The first
/// converter failure aborts the batch; logs already written stay.
pub async fn generate(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerationReport>, ApiError> {
    let request: GenerateRequest = optional_json(&body)?;
    let (target, invalid) = Target::parse_names(request.repositories);
    if !invalid.is_empty() {
        warn!(names = ?invalid, "Ignoring invalid repository names");
    }
    let config = app.config();

    let mut report = generate_logs(
        &config.repo_store(),
        &config.log_store(),
        &config.converter(),
        &target,
        &app.limits(),
        app.locks(),
    )
    .await?;
    report.invalid = invalid;
    Ok(Json(report))
}

pub async fn combine(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<CombineReport>, ApiError> {
    let request: CombineRequest = optional_json(&body)?;
    let report = combine_logs_locked(app.config().log_store(), request.order, app.locks()).await?;
    Ok(Json(report))
}
