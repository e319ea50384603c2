//! Error type shared by all API handlers.
//!
//! Every failure renders as `{"error": "<message>"}` with a status derived
//! from the underlying module error.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::SettingsError;
use crate::logs::LogError;
use crate::process::ToolError;
use crate::render::RenderError;
use crate::repos::RepoError;
use crate::types::InvalidName;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Logs(#[from] LogError),

    #[error(transparent)]
    Repos(#[from] RepoError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{0}")]
    InvalidName(#[from] InvalidName),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn tool_status(e: &ToolError) -> StatusCode {
    if e.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidName(_) => StatusCode::BAD_REQUEST,

            ApiError::Logs(e) => match e {
                LogError::InvalidName(_) => StatusCode::BAD_REQUEST,
                LogError::NotFound(_) => StatusCode::NOT_FOUND,
                LogError::ToolFailed { source, .. } => tool_status(source),
                LogError::Io { .. } | LogError::Background(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            ApiError::Repos(e) => match e {
                RepoError::NotFound(_) => StatusCode::NOT_FOUND,
                RepoError::AlreadyExists(_) | RepoError::InvalidName(_) => StatusCode::BAD_REQUEST,
                RepoError::Clone { source, .. } => tool_status(source),
                RepoError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            ApiError::Render(e) => match e {
                RenderError::InvalidName(_) | RenderError::InvalidOption(_) => {
                    StatusCode::BAD_REQUEST
                }
                RenderError::NotFound(_) => StatusCode::NOT_FOUND,
                RenderError::Tool(source) => tool_status(source),
                RenderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            ApiError::Tool(e) => tool_status(e),

            ApiError::Settings(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(LogError::NotFound("x.txt".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn timeout_maps_to_504() {
        let err = ApiError::from(ToolError::TimedOut {
            command: "gource".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn tool_failure_maps_to_500() {
        let err = ApiError::from(RenderError::Tool(ToolError::Cancelled {
            command: "ffmpeg".to_string(),
        }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_name_maps_to_400() {
        let err = ApiError::from(crate::types::RepoName::parse("../etc").unwrap_err());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
