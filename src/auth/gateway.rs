//! Bearer-token gateway for protected paths.
//!
//! Flow Overview:
//! 1) Skip the login path and anything outside the protected prefix.
//! 2) Require `Authorization: Bearer <token>`.
//! 3) Validate the token with the identity provider.
//! 4) Resolve the profile and return a [`Principal`] for the downstream handler.
//!
//! Any provider fault while validating the token is answered as an invalid token. Only a
//! missing provider configuration and profile store faults surface as 500.

use axum::http::HeaderMap;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, instrument, warn};

use super::error::ApiError;
use super::principal::Principal;
use super::provider::{IdentityProvider, ProfileStore, ProviderError, bounded};
use super::utils::extract_bearer_token;

pub const DEFAULT_PROTECTED_PREFIX: &str = "/api/";
pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/login";

/// Which paths the gateway guards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedRoutes {
    prefix: String,
    login_path: String,
}

impl Default for ProtectedRoutes {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PROTECTED_PREFIX.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ProtectedRoutes {
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        path != self.login_path && path.starts_with(&self.prefix)
    }
}

/// Gateway verdict for a request that was not rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum Passage {
    /// Path is not guarded; nothing was checked.
    Bypass,
    Authenticated(Principal),
}

pub struct AuthGateway {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    routes: ProtectedRoutes,
    call_timeout: Duration,
}

impl AuthGateway {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        routes: ProtectedRoutes,
        call_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            profiles,
            routes,
            call_timeout,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &ProtectedRoutes {
        &self.routes
    }

    /// Decide whether a request for `path` may proceed.
    ///
    /// # Errors
    /// `Auth` for a missing, malformed or rejected token, `NotFound` when the identity
    /// has no profile, `Internal` when the provider is unconfigured or the profile store
    /// fails.
    #[instrument(skip(self, headers))]
    pub async fn authorize(&self, path: &str, headers: &HeaderMap) -> Result<Passage, ApiError> {
        if !self.routes.is_protected(path) {
            return Ok(Passage::Bypass);
        }

        let Some(token) = extract_bearer_token(headers) else {
            debug!("missing or malformed authorization header");
            return Err(ApiError::unauthorized());
        };

        self.resolve(&token).await.map(Passage::Authenticated)
    }

    async fn resolve(&self, token: &str) -> Result<Principal, ApiError> {
        let identity = match bounded(self.call_timeout, self.identity.validate_token(token)).await
        {
            Ok(Some(identity)) => identity,
            Ok(None) | Err(ProviderError::Rejected(_)) => {
                return Err(ApiError::Auth("Invalid token".to_string()));
            }
            Err(ProviderError::NotConfigured) => {
                error!("Identity provider is not configured");
                return Err(ApiError::Internal("Internal server error".to_string()));
            }
            Err(err) => {
                warn!("Token validation failed: {err}");
                return Err(ApiError::Auth("Invalid token".to_string()));
            }
        };

        match bounded(self.call_timeout, self.profiles.get_profile(&identity.id)).await {
            Ok(Some(profile)) => Ok(Principal::from_profile(profile, identity)),
            Ok(None) => Err(ApiError::NotFound("User not found".to_string())),
            Err(err) => {
                error!("Failed to fetch profile: {err}");
                Err(ApiError::Internal("Failed to fetch user data".to_string()))
            }
        }
    }
}
