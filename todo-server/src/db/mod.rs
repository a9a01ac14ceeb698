//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - One lazily-created pool per process, bounded by `DB_POOL_SIZE`
//! - Single-statement operations; no explicit locking or transactions
//! - Repositories sit behind `TaskRepository` so the service can run on
//!   PostgreSQL or in memory

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{DbConfig, PoolProvider};
pub use repos::*;
