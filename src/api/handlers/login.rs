use axum::{
    Json,
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::{net::SocketAddr, sync::Arc};

use crate::auth::{AuthState, ErrorBody, LoginRequest, LoginResponse, extract_client_ip};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted.", body = LoginResponse),
        (status = 401, description = "Credentials rejected.", body = ErrorBody),
        (status = 422, description = "Missing body, email or password.", body = ErrorBody),
        (status = 429, description = "Too many recent failures for this address and email.", body = ErrorBody),
        (status = 500, description = "Identity provider or audit store fault.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let ip = extract_client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let request = payload.map(|Json(request)| request);

    match state.login().login(&ip, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}
