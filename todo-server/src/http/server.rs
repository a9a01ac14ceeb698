//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::service::TaskService;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,

    /// Port to bind to (default: 3001)
    pub port: u16,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_permissive: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(tasks: TaskService) -> Self {
        Self { tasks }
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }

    // Localhost only
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:3001"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://127.0.0.1:3001"),
        ])
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router with all routes
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::tasks::router())
        .layer(cors_layer(cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(TaskService::new(repo));
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, config.cors_permissive);

    // Bind listener
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(
        "Server running at http://{}:{}",
        config.host,
        config.port
    );

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server closed");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::db::repos::{DbError, MemoryTaskRepo, TaskRepository};
    use crate::models::{NewTask, Task, TaskFilter, TaskPatch};

    fn app() -> Router {
        let service = TaskService::new(Arc::new(MemoryTaskRepo::new()));
        build_router(AppState::new(service), false)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(app: &Router, title: &str) -> Value {
        let (status, body) = send(app, "POST", "/api/tasks", Some(json!({ "title": title }))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.host, "0.0.0.0");
        assert!(!config.cors_permissive);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_returns_201_envelope() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({ "title": "Buy milk", "description": "2 litres" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "ok");
        let task = &body["data"];
        assert_eq!(task["title"], "Buy milk");
        assert_eq!(task["description"], "2 litres");
        assert_eq!(task["isCompleted"], false);
        assert_eq!(task["createdAt"], task["updatedAt"]);
        assert!(task["id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_create_with_empty_title_is_400() {
        let (status, body) = send(&app(), "POST", "/api/tasks", Some(json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let router = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/tasks")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&router, "POST", "/api/tasks", Some(json!({ "title": 42 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_get_and_invalid_ids() {
        let app = app();
        let created = create(&app, "Read book").await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(&app, "GET", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Read book");

        let (status, body) = send(&app, "GET", "/api/tasks/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Task not found");

        for bad in ["abc", "0", "-3"] {
            let (status, body) = send(&app, "GET", &format!("/api/tasks/{bad}"), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "id {bad}");
            assert_eq!(body["message"], "Invalid task id");
        }
    }

    #[tokio::test]
    async fn test_partial_update() {
        let app = app();
        let (_, body) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({ "title": "Draft", "description": "keep me" })),
        )
        .await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/tasks/{id}"),
            Some(json!({ "isCompleted": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Draft");
        assert_eq!(body["data"]["description"], "keep me");
        assert_eq!(body["data"]["isCompleted"], true);

        // No body at all leaves the task unchanged
        let (status, body) = send(&app, "PUT", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isCompleted"], true);

        let (status, _) = send(
            &app,
            "PUT",
            "/api/tasks/12345",
            Some(json!({ "title": "ghost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/tasks/{id}"),
            Some(json!({ "title": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_complete_and_uncomplete() {
        let app = app();
        let id = create(&app, "Toggle me").await["id"].as_i64().unwrap();

        let (status, body) = send(&app, "POST", &format!("/api/tasks/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isCompleted"], true);

        let (status, body) =
            send(&app, "POST", &format!("/api/tasks/{id}/uncomplete"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isCompleted"], false);

        let (status, _) = send(&app, "POST", "/api/tasks/77/complete", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete() {
        let app = app();
        let id = create(&app, "Delete me").await["id"].as_i64().unwrap();

        let (status, body) = send(&app, "DELETE", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "message": "Task deleted" }));

        let (status, body) = send(&app, "DELETE", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_list_search() {
        let app = app();
        create(&app, "foo first").await;
        create(&app, "unrelated").await;
        create(&app, "FOOD shopping").await;

        let (status, body) = send(&app, "GET", "/api/tasks?q=foo", None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(titles, vec!["FOOD shopping", "foo first"]);

        let (_, body) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_ready_with_memory_store() {
        let (status, body) = send(&app(), "GET", "/api/tasks/_ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unparseable_query_uses_error_envelope() {
        let (status, body) = send(&app(), "GET", "/api/tasks?q=a&q=b", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "query");
    }

    #[tokio::test]
    async fn test_title_stored_as_sent() {
        let app = app();
        let task = create(&app, "  padded  ").await;
        assert_eq!(task["title"], "  padded  ");

        let task = create(&app, "   ").await;
        assert_eq!(task["title"], "   ");

        let id = task["id"].as_i64().unwrap();
        let (_, body) = send(&app, "GET", &format!("/api/tasks/{id}"), None).await;
        assert_eq!(body["data"]["title"], "   ");
    }

    #[tokio::test]
    async fn test_ready_segment_is_not_a_task_id() {
        let app = app();
        for method in ["PUT", "DELETE"] {
            let (status, body) = send(&app, method, "/api/tasks/_ready", None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
            assert_eq!(body["message"], "Invalid task id");
        }
    }

    #[tokio::test]
    async fn test_openapi_document_lists_task_routes() {
        let (status, body) = send(&app(), "GET", "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);

        let paths = body["paths"].as_object().unwrap();
        for path in [
            "/api/tasks",
            "/api/tasks/_ready",
            "/api/tasks/{id}",
            "/api/tasks/{id}/complete",
            "/api/tasks/{id}/uncomplete",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        for method in ["get", "put", "delete"] {
            assert!(paths["/api/tasks/{id}"].get(method).is_some(), "{method}");
        }
        assert!(body["components"]["schemas"]["TaskResponse"].is_object());
    }

    /// Repository whose backing store is unreachable
    struct DownRepo;

    fn down() -> DbError {
        DbError::Sqlx(sqlx::Error::PoolTimedOut)
    }

    #[async_trait]
    impl TaskRepository for DownRepo {
        async fn list(&self, _: &TaskFilter) -> Result<Vec<Task>, DbError> {
            Err(down())
        }
        async fn get_by_id(&self, _: i64) -> Result<Option<Task>, DbError> {
            Err(down())
        }
        async fn create(&self, _: NewTask) -> Result<Task, DbError> {
            Err(down())
        }
        async fn update(&self, _: i64, _: TaskPatch) -> Result<Option<Task>, DbError> {
            Err(down())
        }
        async fn remove(&self, _: i64) -> Result<bool, DbError> {
            Err(down())
        }
        async fn mark_complete(&self, _: i64, _: bool) -> Result<Option<Task>, DbError> {
            Err(down())
        }
        async fn ping(&self) -> Result<(), DbError> {
            Err(down())
        }
    }

    #[tokio::test]
    async fn test_database_down() {
        let app = build_router(AppState::new(TaskService::new(Arc::new(DownRepo))), false);

        let (status, body) = send(&app, "GET", "/api/tasks/_ready", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Database not ready");

        let (status, body) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to list tasks");

        // Validation still answers without the database
        let (status, _) = send(&app, "POST", "/api/tasks", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
