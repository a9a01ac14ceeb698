//! Database connection pool management
//!
//! One `PoolProvider` per process. The pool is created lazily on first use
//! (no connection is opened until a query needs one) and closed explicitly
//! on shutdown.

use once_cell::sync::OnceCell;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use super::repos::DbError;

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default PostgreSQL port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Connection settings for the tasks database
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DbConfig {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Lazily-created, process-wide PostgreSQL pool.
///
/// Callers beyond `max_connections` wait for a free connection instead of
/// failing.
///
/// # Example
///
/// ```ignore
/// let provider = PoolProvider::new(config);
/// let pool = provider.get()?; // first call builds the pool
/// ```
pub struct PoolProvider {
    config: Result<DbConfig, String>,
    pool: OnceCell<PgPool>,
}

impl PoolProvider {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config: Ok(config),
            pool: OnceCell::new(),
        }
    }

    /// A provider that fails every `get()` with a configuration error.
    ///
    /// Lets the HTTP server start (and report not-ready) while database
    /// settings are missing.
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            config: Err(reason.into()),
            pool: OnceCell::new(),
        }
    }

    /// Get the pool, creating it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] when the provider has no database settings.
    pub fn get(&self) -> Result<&PgPool, DbError> {
        self.pool.get_or_try_init(|| {
            let config = self.config.as_ref().map_err(|e| DbError::Config(e.clone()))?;
            tracing::info!(
                host = %config.host,
                port = config.port,
                database = %config.database,
                max_connections = config.max_connections,
                "Creating database pool"
            );
            Ok(PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect_lazy_with(config.connect_options()))
        })
    }

    /// Whether the pool has been created yet.
    pub fn is_initialized(&self) -> bool {
        self.pool.get().is_some()
    }

    /// Close the pool if it was ever created, waiting for checked-out
    /// connections to be returned.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            tracing::info!("Closing database pool");
            pool.close().await;
        }
    }
}
