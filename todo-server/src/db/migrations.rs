//! Boot-time schema migration for the tasks table
//!
//! Statements are idempotent (`IF NOT EXISTS`), so running them on every
//! start is safe. At boot they run in the background with a bounded retry
//! loop while the HTTP server is already accepting requests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use super::pool::PoolProvider;
use super::repos::DbError;

/// Default number of boot migration attempts
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Default delay between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Create the tasks table and its index
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running task migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL CHECK (char_length(title) > 0),
            description TEXT NULL,
            is_completed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at DESC)")
        .execute(pool)
        .await?;

    tracing::info!("Task migrations complete");
    Ok(())
}

/// Bounded fixed-delay retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

/// How the boot migration loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Succeeded on the given attempt (1-based)
    Completed { attempt: u32 },
    /// Database settings are missing; retrying cannot help
    Misconfigured,
    /// Every attempt failed
    Exhausted,
}

/// Call `attempt` until it succeeds, the policy runs out, or it reports a
/// configuration error.
pub async fn run_with_retry<F, Fut>(policy: RetryPolicy, mut attempt: F) -> MigrationOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DbError>>,
{
    let attempts = policy.attempts.max(1);

    for i in 1..=attempts {
        match attempt().await {
            Ok(()) => {
                tracing::info!(attempt = i, "Database migrations completed");
                return MigrationOutcome::Completed { attempt: i };
            }
            Err(DbError::Config(reason)) => {
                tracing::error!(
                    %reason,
                    "Database settings missing. Set DB_HOST, DB_USER, DB_PASSWORD and DB_NAME \
                     (optional: DB_PORT, DB_POOL_SIZE)"
                );
                return MigrationOutcome::Misconfigured;
            }
            Err(e) => {
                tracing::warn!(attempt = i, attempts, error = %e, "Migration attempt failed");
                if i < attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    tracing::error!(
        attempts,
        "Migrations did not complete; the server is up but the database may not be ready. \
         Check /api/tasks/_ready"
    );
    MigrationOutcome::Exhausted
}

/// Run the tasks migration against the provider's pool with retries.
pub async fn migrate_on_boot(pools: Arc<PoolProvider>, policy: RetryPolicy) -> MigrationOutcome {
    run_with_retry(policy, || {
        let pools = Arc::clone(&pools);
        async move { run(pools.get()?).await }
    })
    .await
}
