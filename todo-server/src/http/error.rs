//! API error types with IntoResponse
//!
//! Errors are converted to the `{status: "error", message, details?}`
//! envelope with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::repos::DbError;
use crate::models::ValidationErrors;
use crate::service::TaskServiceError;

/// One entry of the `details` array on a 400 response
#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct FieldIssue {
    #[schema(value_type = String, example = "title")]
    pub field: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldIssue>>,
}

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationErrors),

    /// Path id is not a positive integer (400)
    InvalidId,

    /// Resource not found (404)
    NotFound { resource: &'static str },

    /// Database or other unexpected error (500, logged)
    Internal { message: &'static str, source: DbError },
}

impl ApiError {
    /// Map a service error, using `message` as the generic 500 text.
    ///
    /// ```ignore
    /// svc.list(q).await.map_err(ApiError::failed("Failed to list tasks"))?;
    /// ```
    pub fn failed(message: &'static str) -> impl FnOnce(TaskServiceError) -> Self {
        move |e| match e {
            TaskServiceError::Validation(errors) => Self::Validation(errors),
            TaskServiceError::NotFound { .. } => Self::NotFound { resource: "Task" },
            TaskServiceError::Db(source) => Self::Internal { message, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidId => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => ErrorBody {
                status: "error",
                message: "Validation failed".to_owned(),
                details: Some(
                    errors
                        .issues()
                        .iter()
                        .map(|issue| FieldIssue {
                            field: issue.field(),
                            message: issue.to_string(),
                        })
                        .collect(),
                ),
            },
            Self::InvalidId => ErrorBody {
                status: "error",
                message: "Invalid task id".to_owned(),
                details: None,
            },
            Self::NotFound { resource } => ErrorBody {
                status: "error",
                message: format!("{} not found", resource),
                details: None,
            },
            Self::Internal { message, source } => {
                // Log the actual error, return generic message
                tracing::error!(error = %source, "{}", message);
                ErrorBody {
                    status: "error",
                    message: message.to_owned(),
                    details: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}
