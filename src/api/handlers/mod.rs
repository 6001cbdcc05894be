//! HTTP handlers. Business rules live in [`crate::auth`]; these adapt them to axum.

pub mod health;
pub mod login;
pub mod me;

use axum::response::{IntoResponse, Response};

use crate::auth::ApiError;

/// Fallback for paths with no route.
pub async fn not_found() -> Response {
    ApiError::NotFound("Not found".to_string()).into_response()
}
