//! Login with brute-force lockout.
//!
//! Flow Overview:
//! 1) Validate the body (non-empty email and password).
//! 2) Count recent failures for `(ip, email)`; at the threshold answer 429 without
//!    calling the identity provider or writing a record.
//! 3) Verify credentials with the identity provider.
//! 4) Record the attempt, then answer 200, 401, or 429 when this failure reaches the
//!    threshold.
//!
//! Count and insert are separate store calls, so concurrent attempts can overshoot the
//! threshold. The audit write is awaited before the response is built; a failed write is
//! logged and does not change the response.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::error::ApiError;
use super::lockout::{LockoutPolicy, LockoutTracker};
use super::provider::{AuditStore, IdentityProvider, ProviderError, SigninAttempt, bounded};

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub uuid: String,
    pub email: String,
    /// `Bearer <opaque session token>`.
    pub token: String,
}

pub struct LoginHandler {
    tracker: LockoutTracker,
    identity: Arc<dyn IdentityProvider>,
    audit: Arc<dyn AuditStore>,
    call_timeout: Duration,
}

impl LoginHandler {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        audit: Arc<dyn AuditStore>,
        policy: LockoutPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            tracker: LockoutTracker::new(audit.clone(), policy, call_timeout),
            identity,
            audit,
            call_timeout,
        }
    }

    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        self.tracker.policy()
    }

    /// Run one login attempt from `ip`.
    ///
    /// # Errors
    /// `Validation` for a missing body or empty fields, `Lockout` at the threshold,
    /// `Auth` for rejected credentials, `Internal` for any collaborator fault.
    #[instrument(skip(self, request))]
    pub async fn login(
        &self,
        ip: &str,
        request: Option<LoginRequest>,
    ) -> Result<LoginResponse, ApiError> {
        let Some(request) = request else {
            return Err(ApiError::Validation(
                "Request body is required".to_string(),
            ));
        };

        let (email, password) = match (request.email, request.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                (email, SecretString::from(password))
            }
            _ => {
                return Err(ApiError::Validation(
                    "Email and password are required".to_string(),
                ));
            }
        };

        let failures = self
            .tracker
            .recent_failures(ip, &email)
            .await
            .map_err(|err| {
                error!("Lockout lookup failed: {err}");
                ApiError::internal()
            })?;

        let policy = self.tracker.policy();
        if policy.is_locked(failures) {
            warn!(failures, "login refused, pair is locked out");
            return Err(ApiError::Lockout);
        }

        match bounded(
            self.call_timeout,
            self.identity.verify_credentials(&email, &password),
        )
        .await
        {
            Ok(session) => {
                self.record_attempt(ip, &email, false).await;
                info!("login succeeded");
                Ok(LoginResponse {
                    uuid: session.user_id,
                    email: session.email,
                    token: format!("Bearer {}", session.access_token.expose_secret()),
                })
            }
            Err(ProviderError::Rejected(message)) => {
                self.record_attempt(ip, &email, true).await;
                if policy.is_locked(failures + 1) {
                    warn!("login failure reached the lockout threshold");
                    Err(ApiError::Lockout)
                } else {
                    Err(ApiError::Auth(message))
                }
            }
            Err(err) => {
                error!("Credential verification failed: {err}");
                Err(ApiError::internal())
            }
        }
    }

    async fn record_attempt(&self, ip: &str, email: &str, failed: bool) {
        let attempt = SigninAttempt {
            email: email.to_string(),
            ip: ip.to_string(),
            timestamp: chrono::Utc::now(),
            failed,
        };
        if let Err(err) = bounded(self.call_timeout, self.audit.record_attempt(&attempt)).await {
            error!(failed, "Failed to record sign-in attempt: {err}");
        }
    }
}
