//! Task endpoints under /api/tasks

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::http::error::{ApiError, FieldIssue};
use crate::http::extractors::{ValidJson, ValidQuery, ValidTaskId};
use crate::http::server::AppState;
use crate::models::{CreateTaskRequest, ListTasksQuery, Task, UpdateTaskRequest};

/// Success envelope: `{status: "ok", data}` or `{status: "ok", message}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            status: "ok",
            data: Some(data),
            message: None,
        })
    }
}

impl Envelope<()> {
    pub fn message(message: &'static str) -> Json<Self> {
        Json(Self {
            status: "ok",
            data: None,
            message: Some(message),
        })
    }
}

/// Task response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            is_completed: t.is_completed,
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
        }
    }
}

type TaskJson = Json<Envelope<TaskResponse>>;

/// `{status: "ok", data: Task}` as documented in the OpenAPI schema
#[derive(ToSchema)]
pub struct TaskEnvelope {
    #[schema(example = "ok")]
    pub status: String,
    pub data: TaskResponse,
}

/// `{status: "ok", data: [Task]}` as documented in the OpenAPI schema
#[derive(ToSchema)]
pub struct TaskListEnvelope {
    #[schema(example = "ok")]
    pub status: String,
    pub data: Vec<TaskResponse>,
}

/// `{status: "ok", message}` as documented in the OpenAPI schema
#[derive(ToSchema)]
pub struct MessageEnvelope {
    #[schema(example = "ok")]
    pub status: String,
    pub message: String,
}

/// `{status: "error", message, details?}` as documented in the OpenAPI schema
#[derive(ToSchema)]
pub struct ErrorEnvelope {
    #[schema(example = "error")]
    pub status: String,
    pub message: String,
    pub details: Option<Vec<FieldIssue>>,
}

/// GET /api/tasks - list tasks, optional `?q=` title search
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Tasks, newest first", body = TaskListEnvelope),
        (status = 400, description = "Unparseable query string", body = ErrorEnvelope),
        (status = 500, description = "Failed to list tasks", body = ErrorEnvelope)
    )
)]
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListTasksQuery>,
) -> Result<Json<Envelope<Vec<TaskResponse>>>, ApiError> {
    let tasks = state
        .tasks
        .list(query)
        .await
        .map_err(ApiError::failed("Failed to list tasks"))?;

    Ok(Envelope::data(
        tasks.into_iter().map(TaskResponse::from).collect(),
    ))
}

/// GET /api/tasks/{id}
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "The task", body = TaskEnvelope),
        (status = 400, description = "Invalid task id", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Failed to retrieve task", body = ErrorEnvelope)
    )
)]
async fn get_task(
    State(state): State<Arc<AppState>>,
    ValidTaskId(id): ValidTaskId,
) -> Result<TaskJson, ApiError> {
    let task = state
        .tasks
        .get(id)
        .await
        .map_err(ApiError::failed("Failed to retrieve task"))?;

    Ok(Envelope::data(TaskResponse::from(task)))
}

/// POST /api/tasks
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskEnvelope),
        (status = 400, description = "Validation failed", body = ErrorEnvelope),
        (status = 500, description = "Failed to create task", body = ErrorEnvelope)
    )
)]
async fn create_task(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateTaskRequest>,
) -> Result<(StatusCode, TaskJson), ApiError> {
    let task = state
        .tasks
        .create(req)
        .await
        .map_err(ApiError::failed("Failed to create task"))?;

    Ok((StatusCode::CREATED, Envelope::data(TaskResponse::from(task))))
}

/// PUT /api/tasks/{id} - partial update
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskEnvelope),
        (status = 400, description = "Validation failed or invalid task id", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Failed to update task", body = ErrorEnvelope)
    )
)]
async fn update_task(
    State(state): State<Arc<AppState>>,
    ValidTaskId(id): ValidTaskId,
    ValidJson(req): ValidJson<UpdateTaskRequest>,
) -> Result<TaskJson, ApiError> {
    let task = state
        .tasks
        .update(id, req)
        .await
        .map_err(ApiError::failed("Failed to update task"))?;

    Ok(Envelope::data(TaskResponse::from(task)))
}

/// DELETE /api/tasks/{id}
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = MessageEnvelope),
        (status = 400, description = "Invalid task id", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Failed to delete task", body = ErrorEnvelope)
    )
)]
async fn delete_task(
    State(state): State<Arc<AppState>>,
    ValidTaskId(id): ValidTaskId,
) -> Result<Json<Envelope<()>>, ApiError> {
    state
        .tasks
        .remove(id)
        .await
        .map_err(ApiError::failed("Failed to delete task"))?;

    Ok(Envelope::message("Task deleted"))
}

/// POST /api/tasks/{id}/complete
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/complete",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task marked completed", body = TaskEnvelope),
        (status = 400, description = "Invalid task id", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Failed to complete task", body = ErrorEnvelope)
    )
)]
async fn complete_task(
    State(state): State<Arc<AppState>>,
    ValidTaskId(id): ValidTaskId,
) -> Result<TaskJson, ApiError> {
    let task = state
        .tasks
        .mark_complete(id, true)
        .await
        .map_err(ApiError::failed("Failed to complete task"))?;

    Ok(Envelope::data(TaskResponse::from(task)))
}

/// POST /api/tasks/{id}/uncomplete
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/uncomplete",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task marked not completed", body = TaskEnvelope),
        (status = 400, description = "Invalid task id", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Failed to uncomplete task", body = ErrorEnvelope)
    )
)]
async fn uncomplete_task(
    State(state): State<Arc<AppState>>,
    ValidTaskId(id): ValidTaskId,
) -> Result<TaskJson, ApiError> {
    let task = state
        .tasks
        .mark_complete(id, false)
        .await
        .map_err(ApiError::failed("Failed to uncomplete task"))?;

    Ok(Envelope::data(TaskResponse::from(task)))
}

/// GET /api/tasks/_ready - 200 when the database answers
#[utoipa::path(
    get,
    path = "/api/tasks/_ready",
    tag = "tasks",
    responses(
        (status = 200, description = "Database ready", body = MessageEnvelope),
        (status = 500, description = "Database not ready", body = ErrorEnvelope)
    )
)]
async fn ready(State(state): State<Arc<AppState>>) -> Result<Json<Envelope<()>>, ApiError> {
    state
        .tasks
        .ready()
        .await
        .map_err(|source| ApiError::Internal {
            message: "Database not ready",
            source,
        })?;

    Ok(Envelope::message("Database ready"))
}

/// PUT/DELETE /api/tasks/_ready - `_ready` is not a task id
async fn reserved_id() -> ApiError {
    ApiError::InvalidId
}

/// OpenAPI description of the task endpoints
#[derive(OpenApi)]
#[openapi(
    info(
        title = "To-Do API",
        description = "CRUD endpoints for to-do tasks"
    ),
    paths(
        list_tasks,
        create_task,
        ready,
        get_task,
        update_task,
        delete_task,
        complete_task,
        uncomplete_task
    ),
    components(schemas(
        TaskResponse,
        CreateTaskRequest,
        UpdateTaskRequest,
        TaskEnvelope,
        TaskListEnvelope,
        MessageEnvelope,
        ErrorEnvelope,
        FieldIssue
    )),
    tags((name = "tasks", description = "Task management"))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Task routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/_ready",
            get(ready).put(reserved_id).delete(reserved_id),
        )
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/complete", post(complete_task))
        .route("/api/tasks/{id}/uncomplete", post(uncomplete_task))
        .route("/api-docs/openapi.json", get(openapi_json))
}
