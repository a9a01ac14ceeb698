//! In-memory task repository.
//!
//! Same contract as [`PgTaskRepo`](super::PgTaskRepo); used for router and
//! service tests and for running without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{DbError, TaskRepository};
use crate::models::{NewTask, Task, TaskDescription, TaskFilter, TaskPatch};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    tasks: BTreeMap<i64, Task>,
}

/// Thread-safe in-memory task store
#[derive(Default)]
pub struct MemoryTaskRepo {
    state: RwLock<MemoryState>,
}

impl MemoryTaskRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepo {
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        let state = self.state.read().await;
        let needle = filter.title_contains.as_deref().map(str::to_lowercase);

        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| match &needle {
                Some(n) => t.title.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(tasks)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>, DbError> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn create(&self, task: NewTask) -> Result<Task, DbError> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let now = Utc::now();

        let task = Task {
            id: state.next_id,
            title: task.title.into_string(),
            description: task.description.map(TaskDescription::into_string),
            is_completed: false,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> Result<Option<Task>, DbError> {
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(task.clone()));
        }

        if let Some(title) = patch.title {
            task.title = title.into_string();
        }
        if let Some(description) = patch.description {
            task.description = description.map(TaskDescription::into_string);
        }
        if let Some(done) = patch.is_completed {
            task.is_completed = done;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn remove(&self, id: i64) -> Result<bool, DbError> {
        Ok(self.state.write().await.tasks.remove(&id).is_some())
    }

    async fn mark_complete(&self, id: i64, complete: bool) -> Result<Option<Task>, DbError> {
        let mut state = self.state.write().await;
        Ok(state.tasks.get_mut(&id).map(|task| {
            task.is_completed = complete;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
