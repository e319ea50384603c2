//! HTTP server for the activity log aggregator.
//!
//! This module implements the HTTP server that:
//! - Clones and removes repositories under the data directory
//! - Generates per-repository logs and combines them into one
//! - Starts renders and avatar downloads through external tools
//! - Provides health checks for liveness checks
//!
//! # Endpoints
//!
//! - `GET /health` - Returns 200 if server is running
//! - `GET|PUT /api/config` - Reads or replaces the persisted settings
//! - `GET|POST /api/repositories` - Lists or clones repositories
//! - `DELETE /api/repositories/{name}` - Removes a repository
//! - `GET /api/logs` - Lists log files
//! - `GET /api/logs/{name}` - Summarizes one log file
//! - `POST /api/logs/generate` - Generates per-repository logs
//! - `POST /api/logs/combine` - Combines all logs into `ACombinedLog.txt`
//! - `GET /api/renders` - Lists rendered videos
//! - `DELETE /api/renders/{name}` - Removes a rendered video
//! - `POST /api/renders/start` - Renders a log to video
//! - `POST /api/avatars/download` - Downloads author avatars

use std::sync::Arc;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::logs::PathLocks;
use crate::process::RunLimits;

pub mod avatars;
pub mod error;
pub mod health;
pub mod logs;
pub mod renders;
pub mod repositories;
pub mod settings;

pub use error::ApiError;
pub use health::health_handler;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,

    /// Serializes writers of the same log file across requests.
    locks: PathLocks,

    /// Fired on shutdown; running tools are killed.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_shutdown(config, CancellationToken::new())
    }

    /// Creates an `AppState` whose tool runs are cancelled by `shutdown`.
    pub fn with_shutdown(config: ServerConfig, shutdown: CancellationToken) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                config,
                locks: PathLocks::new(),
                shutdown,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn locks(&self) -> &PathLocks {
        &self.inner.locks
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Limits for one request's tool runs.
    pub fn limits(&self) -> RunLimits {
        RunLimits::new(self.inner.config.tool_timeout, self.inner.shutdown.child_token())
    }
}

/// Parses an optional JSON body; an empty body yields the default.
pub(crate) fn optional_json<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{delete, get, post};

    axum::Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/config",
            get(settings::get_settings).put(settings::put_settings),
        )
        .route(
            "/api/repositories",
            get(repositories::list_repositories).post(repositories::clone_repository),
        )
        .route(
            "/api/repositories/{name}",
            delete(repositories::delete_repository),
        )
        .route("/api/logs", get(logs::list_logs))
        .route("/api/logs/generate", post(logs::generate))
        .route("/api/logs/combine", post(logs::combine))
        .route("/api/logs/{name}", get(logs::log_summary))
        .route("/api/renders", get(renders::list))
        .route("/api/renders/start", post(renders::start))
        .route("/api/renders/{name}", delete(renders::delete))
        .route("/api/avatars/download", post(avatars::download))
        .with_state(app_state)
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    use crate::test_utils::make_repo;

    /// Creates a test app state rooted in a temporary data directory.
    fn test_app_state() -> (AppState, TempDir) {
        let dir = tempdir().unwrap();
        let config = ServerConfig::new(dir.path());
        config.ensure_dirs().unwrap();
        (AppState::new(config), dir)
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    // ─── Health endpoint tests ───

    #[tokio::test]
    async fn health_returns_200() {
        let (state, _dir) = test_app_state();
        let app = build_router(state);

        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    // ─── Settings endpoint tests ───

    #[tokio::test]
    async fn config_get_initializes_defaults() {
        let (state, _dir) = test_app_state();

        let (status, body) = send(&state, get("/api/config")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_render_settings"]["resolution"], "1920x1080");
        assert!(state.config().settings_path().exists());
    }

    #[tokio::test]
    async fn config_put_then_get_round_trips() {
        let (state, _dir) = test_app_state();
        let settings = serde_json::json!({
            "github_api_key": "token",
            "default_render_settings": {
                "resolution": "1280x720",
                "seconds_per_day": 2.0,
                "hide": ["mouse"]
            },
            "theme": "dark"
        });

        let (status, body) = send(&state, json_request("PUT", "/api/config", settings)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (_, body) = send(&state, get("/api/config")).await;
        assert_eq!(body["github_api_key"], "token");
        assert_eq!(body["default_render_settings"]["resolution"], "1280x720");
        assert_eq!(body["theme"], "dark");
    }

    // ─── Repository endpoint tests ───

    #[tokio::test]
    async fn repositories_lists_only_marked_directories() {
        let (state, _dir) = test_app_state();
        let repos = state.config().repos_dir();
        make_repo(&repos, "beta");
        make_repo(&repos, "alpha");
        fs::create_dir_all(repos.join("plain")).unwrap();

        let (status, body) = send(&state, get("/api/repositories")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["alpha", "beta"]));
    }

    #[tokio::test]
    async fn clone_without_url_is_400() {
        let (state, _dir) = test_app_state();

        let (status, body) = send(
            &state,
            json_request("POST", "/api/repositories", serde_json::json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("URL"));
    }

    #[tokio::test]
    async fn clone_existing_repository_is_400() {
        let (state, _dir) = test_app_state();
        make_repo(&state.config().repos_dir(), "widgets");

        let (status, _) = send(
            &state,
            json_request(
                "POST",
                "/api/repositories",
                serde_json::json!({ "url": "https://example.com/acme/widgets.git" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_repository() {
        let (state, _dir) = test_app_state();
        let path = make_repo(&state.config().repos_dir(), "gone");

        let (status, body) = send(&state, empty_request("DELETE", "/api/repositories/gone")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert!(!path.exists());

        let (status, _) = send(&state, empty_request("DELETE", "/api/repositories/gone")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_repository_rejects_separator_names() {
        let (state, _dir) = test_app_state();

        let (status, _) = send(&state, empty_request("DELETE", "/api/repositories/a%2Fb")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ─── Log endpoint tests ───

    #[tokio::test]
    async fn combine_merges_logs_and_lists_them() {
        let (state, _dir) = test_app_state();
        let logs = state.config().logs_dir();
        fs::write(logs.join("repoA.txt"), "100|/repoA/file1.py|A\n100|/repoA/file1.py|A\n").unwrap();
        fs::write(logs.join("repoB.txt"), "50|/repoB/file2.py|M\n").unwrap();

        let (status, body) = send(
            &state,
            json_request("POST", "/api/logs/combine", serde_json::json!({ "order": "chronological" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unique_lines"], 2);
        assert_eq!(
            fs::read_to_string(logs.join("ACombinedLog.txt")).unwrap(),
            "50|/repoB/file2.py|M\n100|/repoA/file1.py|A\n"
        );

        let (_, body) = send(&state, get("/api/logs")).await;
        assert_eq!(body, serde_json::json!(["ACombinedLog.txt", "repoA.txt", "repoB.txt"]));
    }

    #[tokio::test]
    async fn combine_without_body_uses_lexicographic_order() {
        let (state, _dir) = test_app_state();
        let logs = state.config().logs_dir();
        fs::write(logs.join("repoA.txt"), "100|/repoA/file1.py|A\n").unwrap();
        fs::write(logs.join("repoB.txt"), "50|/repoB/file2.py|M\n").unwrap();

        let (status, _) = send(&state, empty_request("POST", "/api/logs/combine")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fs::read_to_string(logs.join("ACombinedLog.txt")).unwrap(),
            "100|/repoA/file1.py|A\n50|/repoB/file2.py|M\n"
        );
    }

    #[tokio::test]
    async fn log_summary_and_missing_log() {
        let (state, _dir) = test_app_state();
        fs::write(
            state.config().logs_dir().join("repoA.txt"),
            "100|/repoA/a|A\n200|/repoA/b|M\n",
        )
        .unwrap();

        let (status, body) = send(&state, get("/api/logs/repoA.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entry_count"], 2);
        assert_eq!(body["first_timestamp"], 100);
        assert_eq!(body["last_timestamp"], 200);

        let (status, body) = send(&state, get("/api/logs/nope.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn generate_skips_missing_repositories() {
        let (state, _dir) = test_app_state();

        let (status, body) = send(
            &state,
            json_request(
                "POST",
                "/api/logs/generate",
                serde_json::json!({ "repositories": ["missing"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skipped"], serde_json::json!(["missing"]));
        assert_eq!(body["log_files"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn generate_reports_traversal_names_without_generating_all() {
        let (state, _dir) = test_app_state();
        make_repo(&state.config().repos_dir(), "repoA");

        let (status, body) = send(
            &state,
            json_request(
                "POST",
                "/api/logs/generate",
                serde_json::json!({ "repositories": ["../etc"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invalid"], serde_json::json!(["../etc"]));
        assert_eq!(body["log_files"], serde_json::json!([]));
        assert!(!state.config().logs_dir().join("repoA.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn generate_processes_valid_names_beside_invalid_ones() {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::new(dir.path());
        config.ensure_dirs().unwrap();
        config.gource_bin = crate::test_utils::fake_converter(dir.path(), "7|/lib.rs|A\n");
        let state = AppState::new(config);
        make_repo(&state.config().repos_dir(), "good");

        let (status, body) = send(
            &state,
            json_request(
                "POST",
                "/api/logs/generate",
                serde_json::json!({ "repositories": ["good", "../etc"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["log_files"].as_array().unwrap().len(), 1);
        assert_eq!(body["invalid"], serde_json::json!(["../etc"]));
        assert_eq!(body["skipped"], serde_json::json!([]));
        assert_eq!(
            fs::read_to_string(state.config().logs_dir().join("good.txt")).unwrap(),
            "7|/good/lib.rs|A\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn generate_all_then_combine() {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::new(dir.path());
        config.ensure_dirs().unwrap();
        config.gource_bin = crate::test_utils::fake_converter(dir.path(), "100|/src/main.rs|A\n");
        let state = AppState::new(config);
        make_repo(&state.config().repos_dir(), "repoA");
        make_repo(&state.config().repos_dir(), "repoB");

        let (status, body) = send(&state, empty_request("POST", "/api/logs/generate")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["log_files"].as_array().unwrap().len(), 2);

        let (status, _) = send(&state, empty_request("POST", "/api/logs/combine")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fs::read_to_string(state.config().logs_dir().join("ACombinedLog.txt")).unwrap(),
            "100|/repoA/src/main.rs|A\n100|/repoB/src/main.rs|A\n"
        );
    }

    // ─── Render endpoint tests ───

    #[tokio::test]
    async fn render_of_missing_log_is_404() {
        let (state, _dir) = test_app_state();

        let (status, _) = send(
            &state,
            json_request("POST", "/api/renders/start", serde_json::json!({ "log": "nope.txt" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn render_with_bad_resolution_is_400() {
        let (state, _dir) = test_app_state();
        fs::write(state.config().logs_dir().join("ACombinedLog.txt"), "1|/a|A\n").unwrap();

        let (status, _) = send(
            &state,
            json_request(
                "POST",
                "/api/renders/start",
                serde_json::json!({ "options": { "resolution": "huge" } }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn renders_list_and_delete() {
        let (state, _dir) = test_app_state();
        let renders = state.config().renders_dir();
        fs::write(renders.join("movie.mp4"), b"video").unwrap();
        fs::write(renders.join("notes.txt"), b"skip").unwrap();

        let (status, body) = send(&state, get("/api/renders")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "movie.mp4");
        assert_eq!(body[0]["size"], 5);

        let (status, _) = send(&state, empty_request("DELETE", "/api/renders/movie.mp4")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!renders.join("movie.mp4").exists());

        let (status, _) = send(&state, empty_request("DELETE", "/api/renders/movie.mp4")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ─── Avatar endpoint tests ───

    #[cfg(unix)]
    #[tokio::test]
    async fn avatars_returns_script_output() {
        let dir = tempdir().unwrap();
        let mut config = ServerConfig::new(dir.path());
        config.ensure_dirs().unwrap();
        config.perl_bin = crate::test_utils::write_tool_script(
            dir.path(),
            "fake-perl",
            "echo \"email=[$3]\"",
        );
        let state = AppState::new(config);

        let (status, body) = send(
            &state,
            json_request(
                "POST",
                "/api/avatars/download",
                serde_json::json!({ "email": "dev@example.com" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "email=[dev@example.com]\n");
    }
}
