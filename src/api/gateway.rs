//! Axum middleware around [`AuthGateway`](crate::auth::AuthGateway).
//!
//! The principal travels to the handler as a request extension; handlers read it with
//! `Option<Extension<Principal>>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{AuthState, Passage};

pub async fn require_principal(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match state.gateway().authorize(&path, request.headers()).await {
        Ok(Passage::Bypass) => next.run(request).await,
        Ok(Passage::Authenticated(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}
