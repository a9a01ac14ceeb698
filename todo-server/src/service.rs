//! Task service - validation and existence checks in front of the repository
//!
//! Payloads are validated before any repository call, so invalid input never
//! reaches the database. Mutations on a missing id report `NotFound`, which
//! callers can tell apart from validation failures.

use std::sync::Arc;

use crate::db::repos::{DbError, TaskRepository};
use crate::models::{
    CreateTaskRequest, ListTasksQuery, NewTask, Task, TaskFilter, TaskPatch, UpdateTaskRequest,
    ValidationErrors,
};

/// Service-level errors for task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("task {id} not found")]
    NotFound { id: i64 },

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Task operations shared by every request handler.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// List tasks, optionally filtered by `q` (trimmed; blank means no filter).
    pub async fn list(&self, query: ListTasksQuery) -> TaskServiceResult<Vec<Task>> {
        let filter = TaskFilter::from(query);
        Ok(self.repo.list(&filter).await?)
    }

    pub async fn get(&self, id: i64) -> TaskServiceResult<Task> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(TaskServiceError::NotFound { id })
    }

    /// Validate and create a task.
    pub async fn create(&self, req: CreateTaskRequest) -> TaskServiceResult<Task> {
        let task = NewTask::parse(req)?;
        let created = self.repo.create(task).await?;
        tracing::info!(id = created.id, "Task created");
        Ok(created)
    }

    /// Validate and apply a partial update.
    pub async fn update(&self, id: i64, req: UpdateTaskRequest) -> TaskServiceResult<Task> {
        let patch = TaskPatch::parse(req)?;
        self.ensure_exists(id).await?;

        // The row can vanish between the check and the write.
        self.repo
            .update(id, patch)
            .await?
            .ok_or(TaskServiceError::NotFound { id })
    }

    pub async fn remove(&self, id: i64) -> TaskServiceResult<()> {
        self.ensure_exists(id).await?;

        if self.repo.remove(id).await? {
            tracing::info!(id, "Task deleted");
            Ok(())
        } else {
            Err(TaskServiceError::NotFound { id })
        }
    }

    /// Set or clear the completed flag.
    pub async fn mark_complete(&self, id: i64, complete: bool) -> TaskServiceResult<Task> {
        self.ensure_exists(id).await?;

        self.repo
            .mark_complete(id, complete)
            .await?
            .ok_or(TaskServiceError::NotFound { id })
    }

    /// Whether the backing store answers.
    pub async fn ready(&self) -> Result<(), DbError> {
        self.repo.ping().await
    }

    async fn ensure_exists(&self, id: i64) -> TaskServiceResult<()> {
        match self.repo.get_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(TaskServiceError::NotFound { id }),
        }
    }
}
