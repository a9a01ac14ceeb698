//! todo-server entry point
//!
//! Binds the HTTP port immediately, runs the tasks migration in the
//! background, and closes the database pool after graceful shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use todo_server::config::Cli;
use todo_server::db::{migrations, PgTaskRepo, PoolProvider};
use todo_server::http::{run_server, AppState};
use todo_server::tracing_setup::{self, TracingConfig};
use todo_server::TaskService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads the environment
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug })
        .context("Failed to initialize tracing")?;

    match dotenv {
        Ok(path) => info!("Loaded configuration from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found, using environment only"),
        Err(e) => warn!(error = %e, "Failed to load .env file"),
    }

    let pools = Arc::new(match cli.database.config() {
        Ok(config) => PoolProvider::new(config),
        Err(missing) => {
            let reason = format!("missing {}", missing.join(", "));
            warn!(%reason, "Database settings incomplete; task routes will fail until set");
            PoolProvider::unconfigured(reason)
        }
    });

    // Migrations run alongside serving traffic
    tokio::spawn(migrations::migrate_on_boot(
        Arc::clone(&pools),
        cli.migrations.policy(),
    ));

    let service = TaskService::new(Arc::new(PgTaskRepo::new(Arc::clone(&pools))));
    let result = run_server(AppState::new(service), cli.server.config()).await;

    pools.close().await;
    result.context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
