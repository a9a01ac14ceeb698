//! Repository implementations for task storage
//!
//! Each repository follows these patterns:
//! - One statement per operation (no multi-statement transactions)
//! - Parameterized SQL only; user input is always bound
//! - "No such row" is `None`/`false`, never an error

use async_trait::async_trait;

use crate::models::{NewTask, Task, TaskFilter, TaskPatch};

pub mod memory;
pub mod tasks;

pub use memory::MemoryTaskRepo;
pub use tasks::PgTaskRepo;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("database not configured: {0}")]
    Config(String),
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks matching `filter`, newest first.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>, DbError>;

    /// Insert a task with `is_completed = false` and return the stored row.
    async fn create(&self, task: NewTask) -> Result<Task, DbError>;

    /// Apply only the fields present in `patch`.
    ///
    /// An empty patch returns the current row untouched. Returns `None` when
    /// no task has this id.
    async fn update(&self, id: i64, patch: TaskPatch) -> Result<Option<Task>, DbError>;

    /// Hard delete. Returns whether a row was removed.
    async fn remove(&self, id: i64) -> Result<bool, DbError>;

    async fn mark_complete(&self, id: i64, complete: bool) -> Result<Option<Task>, DbError>;

    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<(), DbError>;
}
