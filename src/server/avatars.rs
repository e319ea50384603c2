//! Avatar download endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, ApiError, optional_json};
use crate::avatars::{AvatarFetcher, AvatarTarget};

/// Body of `POST /api/avatars/download`. Without an email every author of
/// every repository is fetched.
#[derive(Debug, Default, Deserialize)]
pub struct AvatarRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl AvatarRequest {
    fn target(self) -> AvatarTarget {
        match self.email.filter(|e| !e.trim().is_empty()) {
            Some(email) => AvatarTarget::Single(email),
            None => AvatarTarget::AllRepositories,
        }
    }
}

pub async fn download(State(app): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: AvatarRequest = optional_json(&body)?;
    let config = app.config();
    let fetcher = AvatarFetcher {
        perl_bin: config.perl_bin.clone(),
        script: config.avatar_script.clone(),
    };

    let output = fetcher
        .fetch(
            &config.avatars_dir(),
            &config.repos_dir(),
            &request.target(),
            &app.limits(),
        )
        .await?;
    Ok(Json(json!({ "status": "success", "output": output })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_means_all_repositories() {
        let request = AvatarRequest {
            email: Some("  ".to_string()),
        };
        assert_eq!(request.target(), AvatarTarget::AllRepositories);

        let request = AvatarRequest {
            email: Some("a@b.c".to_string()),
        };
        assert_eq!(request.target(), AvatarTarget::Single("a@b.c".to_string()));
    }
}
