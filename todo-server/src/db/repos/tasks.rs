//! Task repository backed by PostgreSQL
//!
//! - list: optional ILIKE filter, newest first
//! - update: SET clause assembled from the fields present in the patch
//! - update/mark_complete: single UPDATE ... RETURNING (no re-read race)

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{DbError, TaskRepository};
use crate::db::pool::PoolProvider;
use crate::models::{NewTask, Task, TaskDescription, TaskFilter, TaskPatch};

const TASK_COLUMNS: &str = "id, title, description, is_completed, created_at, updated_at";

/// Task repository
pub struct PgTaskRepo {
    pools: Arc<PoolProvider>,
}

impl PgTaskRepo {
    pub fn new(pools: Arc<PoolProvider>) -> Self {
        Self { pools }
    }
}

/// Build an ILIKE pattern matching `needle` literally anywhere in the value.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Build the UPDATE statement for a non-empty patch.
fn update_query(id: i64, patch: TaskPatch) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE tasks SET ");
    let mut set = builder.separated(", ");

    if let Some(title) = patch.title {
        set.push("title = ");
        set.push_bind_unseparated(title.into_string());
    }
    if let Some(description) = patch.description {
        set.push("description = ");
        set.push_bind_unseparated(description.map(TaskDescription::into_string));
    }
    if let Some(done) = patch.is_completed {
        set.push("is_completed = ");
        set.push_bind_unseparated(done);
    }
    set.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING ");
    builder.push(TASK_COLUMNS);
    builder
}

#[async_trait]
impl TaskRepository for PgTaskRepo {
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        let pool = self.pools.get()?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        builder.push(TASK_COLUMNS);
        builder.push(" FROM tasks");
        if let Some(needle) = &filter.title_contains {
            builder.push(" WHERE title ILIKE ");
            builder.push_bind(contains_pattern(needle));
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let tasks = builder.build_query_as::<Task>().fetch_all(pool).await?;
        Ok(tasks)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>, DbError> {
        let pool = self.pools.get()?;

        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    async fn create(&self, task: NewTask) -> Result<Task, DbError> {
        let pool = self.pools.get()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (title, description, is_completed)
            VALUES ($1, $2, FALSE)
            RETURNING id
            "#,
        )
        .bind(task.title.into_string())
        .bind(task.description.map(TaskDescription::into_string))
        .fetch_one(pool)
        .await?;

        tracing::debug!(id, "Inserted task");

        // Re-read so the caller sees column defaults exactly as stored.
        self.get_by_id(id)
            .await?
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> Result<Option<Task>, DbError> {
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }

        let pool = self.pools.get()?;
        let task = update_query(id, patch)
            .build_query_as::<Task>()
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    async fn remove(&self, id: i64) -> Result<bool, DbError> {
        let pool = self.pools.get()?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_complete(&self, id: i64, complete: bool) -> Result<Option<Task>, DbError> {
        let pool = self.pools.get()?;

        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET is_completed = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(complete)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    async fn ping(&self) -> Result<(), DbError> {
        let pool = self.pools.get()?;
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(pool)
            .await?;
        Ok(())
    }
}
