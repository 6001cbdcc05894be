//! Capability traits for the external collaborators.
//!
//! The gateway never talks to a vendor client directly. The identity provider, the
//! profile store and the audit store are reached through these traits so any backend
//! (the Supabase-compatible one in [`crate::supabase`], the in-memory one in
//! [`super::memory`]) can sit behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Duration};

/// Faults reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider endpoint or service credential is missing.
    #[error("provider is not configured")]
    NotConfigured,
    /// The provider answered and refused the request (bad credentials, bad token).
    #[error("{0}")]
    Rejected(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider call timed out")]
    Timeout,
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

/// Session issued by the identity provider after a successful credential check.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: SecretString,
}

/// Identity resolved from a bearer token.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub id: String,
    /// Subject exactly as the provider returned it.
    pub raw: Value,
}

/// Profile record keyed by identity id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub uuid: String,
    pub email: String,
    pub role: String,
}

/// One login attempt. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninAttempt {
    pub email: String,
    pub ip: String,
    pub timestamp: DateTime<Utc>,
    pub failed: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check an email/password pair. Bad credentials are `ProviderError::Rejected`.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, ProviderError>;

    /// Resolve a bearer token. `Ok(None)` means the provider knows no such identity.
    async fn validate_token(&self, token: &str) -> Result<Option<Identity>, ProviderError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, identity_id: &str) -> Result<Option<Profile>, ProviderError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Most recent attempts for the pair, newest first, at most `limit` records.
    async fn recent_attempts(
        &self,
        ip: &str,
        email: &str,
        limit: usize,
    ) -> Result<Vec<SigninAttempt>, ProviderError>;

    async fn record_attempt(&self, attempt: &SigninAttempt) -> Result<(), ProviderError>;
}

/// Stand-in used when the provider endpoint or credential is missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconfigured;

#[async_trait]
impl IdentityProvider for Unconfigured {
    async fn verify_credentials(
        &self,
        _email: &str,
        _password: &SecretString,
    ) -> Result<Session, ProviderError> {
        Err(ProviderError::NotConfigured)
    }

    async fn validate_token(&self, _token: &str) -> Result<Option<Identity>, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

#[async_trait]
impl ProfileStore for Unconfigured {
    async fn get_profile(&self, _identity_id: &str) -> Result<Option<Profile>, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

#[async_trait]
impl AuditStore for Unconfigured {
    async fn recent_attempts(
        &self,
        _ip: &str,
        _email: &str,
        _limit: usize,
    ) -> Result<Vec<SigninAttempt>, ProviderError> {
        Err(ProviderError::NotConfigured)
    }

    async fn record_attempt(&self, _attempt: &SigninAttempt) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

/// The three collaborators wired into the gateway.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub audit: Arc<dyn AuditStore>,
    configured: bool,
}

impl Collaborators {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            identity,
            profiles,
            audit,
            configured: true,
        }
    }

    /// Every call fails with `ProviderError::NotConfigured`.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            identity: Arc::new(Unconfigured),
            profiles: Arc::new(Unconfigured),
            audit: Arc::new(Unconfigured),
            configured: false,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("configured", &self.configured)
            .finish_non_exhaustive()
    }
}

/// Run one collaborator call under `limit`; expiry becomes `ProviderError::Timeout`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ProviderError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_rejects_every_call() {
        let collaborators = Collaborators::unconfigured();
        assert!(!collaborators.is_configured());

        let password = SecretString::from("secret".to_string());
        assert_eq!(
            collaborators
                .identity
                .verify_credentials("a@example.com", &password)
                .await
                .err(),
            Some(ProviderError::NotConfigured)
        );
        assert_eq!(
            collaborators.identity.validate_token("token").await,
            Err(ProviderError::NotConfigured)
        );
        assert_eq!(
            collaborators.profiles.get_profile("id").await,
            Err(ProviderError::NotConfigured)
        );
        assert_eq!(
            collaborators
                .audit
                .recent_attempts("127.0.0.1", "a@example.com", 10)
                .await,
            Err(ProviderError::NotConfigured)
        );
    }

    #[tokio::test]
    async fn bounded_maps_expiry_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ProviderError>(())
        };
        let result = bounded(Duration::from_millis(10), slow).await;
        assert_eq!(result, Err(ProviderError::Timeout));
    }

    #[tokio::test]
    async fn bounded_passes_through_results() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(result, Ok(7));

        let result: Result<(), _> = bounded(Duration::from_secs(1), async {
            Err(ProviderError::Rejected("nope".to_string()))
        })
        .await;
        assert_eq!(result, Err(ProviderError::Rejected("nope".to_string())));
    }
}
