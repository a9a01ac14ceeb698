//! Process configuration from flags and environment
//!
//! Every flag falls back to an environment variable, and `main` loads a
//! `.env` file from the working directory before parsing, so a deployment
//! can be configured entirely through the environment.

use std::time::Duration;

use clap::{Args, Parser};

use crate::db::migrations::{RetryPolicy, DEFAULT_ATTEMPTS};
use crate::db::pool::{DbConfig, DEFAULT_DB_PORT, DEFAULT_MAX_CONNECTIONS};
use crate::http::ServerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "todo-server",
    version,
    about = "REST API for managing to-do tasks backed by PostgreSQL"
)]
pub struct Cli {
    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub migrations: MigrationArgs,
}

/// HTTP listener settings
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long, env = "CORS_PERMISSIVE")]
    pub cors_permissive: bool,
}

impl ServerArgs {
    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_permissive: self.cors_permissive,
        }
    }
}

/// Database connection settings
///
/// Host, user, password and name are required to reach the database, but
/// not to start the server.
#[derive(Args, Clone)]
pub struct DatabaseArgs {
    /// Database host
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Maximum pooled connections
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub db_pool_size: u32,
}

impl std::fmt::Debug for DatabaseArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseArgs")
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_password", &self.db_password.as_ref().map(|_| "***"))
            .field("db_name", &self.db_name)
            .field("db_pool_size", &self.db_pool_size)
            .finish()
    }
}

impl DatabaseArgs {
    /// Resolve to a [`DbConfig`], or the names of the missing variables.
    pub fn config(&self) -> Result<DbConfig, Vec<&'static str>> {
        let mut missing = Vec::new();
        let mut require = |value: &Option<String>, name: &'static str| match value {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let host = require(&self.db_host, "DB_HOST");
        let user = require(&self.db_user, "DB_USER");
        let password = require(&self.db_password, "DB_PASSWORD");
        let database = require(&self.db_name, "DB_NAME");

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(DbConfig {
            host,
            port: self.db_port,
            user,
            password,
            database,
            max_connections: self.db_pool_size.max(1),
        })
    }
}

/// Boot migration retry settings
#[derive(Args, Debug, Clone)]
pub struct MigrationArgs {
    /// Boot migration attempts before giving up
    #[arg(long, env = "MIGRATION_ATTEMPTS", default_value_t = DEFAULT_ATTEMPTS)]
    pub migration_attempts: u32,

    /// Delay between migration attempts, in milliseconds
    #[arg(long, env = "MIGRATION_DELAY_MS", default_value_t = 3000)]
    pub migration_delay_ms: u64,
}

impl MigrationArgs {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.migration_attempts,
            delay: Duration::from_millis(self.migration_delay_ms),
        }
    }
}
