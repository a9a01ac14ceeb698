//! Custom Axum extractors

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::models::{ValidationError, ValidationErrors};

/// Extract a task id from path, accepting only positive integers
pub struct ValidTaskId(pub i64);

impl<S> FromRequestParts<S> for ValidTaskId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InvalidId)?;

        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(ApiError::InvalidId),
        }
    }
}

/// JSON body whose parse failures become 400 validation errors.
///
/// An empty body is read as `{}`, so a bodiless PUT is a no-op update and a
/// bodiless POST reports the missing fields. The Content-Type header is not
/// checked.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| invalid("body", e.body_text()))?;

        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(raw)
            .map(Self)
            .map_err(|e| invalid("body", e.to_string()))
    }
}

/// Query string whose parse failures become 400 validation errors
/// reported on the `query` field.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| invalid("query", e.body_text()))?;

        Ok(Self(value))
    }
}

fn invalid(field: &'static str, reason: String) -> ApiError {
    ApiError::Validation(ValidationErrors::single(ValidationError::InvalidFormat {
        field,
        reason,
    }))
}
