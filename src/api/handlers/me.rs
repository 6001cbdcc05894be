//! Identity of the caller, as resolved by the gateway.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{ApiError, ErrorBody, Principal};

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MeResponse {
    pub uuid: String,
    pub email: String,
    pub role: String,
}

/// Project the principal into the response body.
///
/// # Errors
/// `Auth("Unauthorized")` when no principal is present.
pub fn whoami(principal: Option<&Principal>) -> Result<MeResponse, ApiError> {
    let principal = principal.ok_or_else(ApiError::unauthorized)?;
    Ok(MeResponse {
        uuid: principal.uuid.clone(),
        email: principal.email.clone(),
        role: principal.role.clone(),
    })
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Return the authenticated identity.", body = MeResponse),
        (status = 401, description = "Missing, malformed or rejected bearer token.", body = ErrorBody),
        (status = 404, description = "Token is valid but no profile exists.", body = ErrorBody),
        (status = 500, description = "Provider not configured or profile store fault.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn me(principal: Option<Extension<Principal>>) -> impl IntoResponse {
    match whoami(principal.as_ref().map(|Extension(principal)| principal)) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}
