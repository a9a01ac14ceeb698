//! todo-server: REST API for to-do tasks
//!
//! Accepts HTTP requests under `/api/tasks`, validates payloads, and maps
//! them onto parameterized SQL against a single `tasks` table.

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod service;
pub mod tracing_setup;

pub use service::{TaskService, TaskServiceError};
