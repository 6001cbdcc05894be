//! In-memory collaborators for tests and local runs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio::sync::{Barrier, Mutex};

use super::provider::{
    AuditStore, Identity, IdentityProvider, Profile, ProfileStore, ProviderError, Session,
    SigninAttempt,
};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

struct Account {
    user_id: String,
    password: String,
    access_token: String,
}

/// Identity provider backed by fixed accounts and tokens.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, Identity>,
    credential_checks: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account; a successful login hands out `access_token`.
    #[must_use]
    pub fn with_account(
        mut self,
        email: &str,
        password: &str,
        user_id: &str,
        access_token: &str,
    ) -> Self {
        self.accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.to_string(),
                password: password.to_string(),
                access_token: access_token.to_string(),
            },
        );
        self
    }

    /// Make `token` resolve to the identity `id`.
    #[must_use]
    pub fn with_token(mut self, token: &str, id: &str, email: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            Identity {
                id: id.to_string(),
                raw: json!({ "id": id, "email": email }),
            },
        );
        self
    }

    /// Number of `verify_credentials` calls seen so far.
    #[must_use]
    pub fn credential_checks(&self) -> usize {
        self.credential_checks.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Unavailable(
                "identity provider unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, ProviderError> {
        self.credential_checks.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        match self.accounts.get(email) {
            Some(account) if account.password == password.expose_secret() => Ok(Session {
                user_id: account.user_id.clone(),
                email: email.to_string(),
                access_token: SecretString::from(account.access_token.clone()),
            }),
            // unknown email and wrong password look the same
            _ => Err(ProviderError::Rejected(INVALID_CREDENTIALS.to_string())),
        }
    }

    async fn validate_token(&self, token: &str) -> Result<Option<Identity>, ProviderError> {
        self.check_available()?;
        Ok(self.tokens.get(token).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: HashMap<String, Profile>,
    unavailable: AtomicBool,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile(mut self, uuid: &str, email: &str, role: &str) -> Self {
        self.profiles.insert(
            uuid.to_string(),
            Profile {
                uuid: uuid.to_string(),
                email: email.to_string(),
                role: role.to_string(),
            },
        );
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, identity_id: &str) -> Result<Option<Profile>, ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(
                "profile store unavailable".to_string(),
            ));
        }
        Ok(self.profiles.get(identity_id).cloned())
    }
}

/// Append-only attempt log.
///
/// A read barrier holds every `recent_attempts` call after it has taken its snapshot,
/// until a given number of callers have arrived. That makes the count-then-insert race
/// reproducible.
#[derive(Default)]
pub struct InMemoryAuditStore {
    attempts: Mutex<Vec<SigninAttempt>>,
    read_barrier: Mutex<Option<Arc<Barrier>>>,
    unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, attempt: SigninAttempt) {
        self.attempts.lock().await.push(attempt);
    }

    /// Snapshot of every stored attempt in insertion order.
    pub async fn attempts(&self) -> Vec<SigninAttempt> {
        self.attempts.lock().await.clone()
    }

    pub async fn set_read_barrier(&self, barrier: Option<Arc<Barrier>>) {
        *self.read_barrier.lock().await = barrier;
    }

    /// Fail reads and writes.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail writes only.
    pub fn set_writes_unavailable(&self, unavailable: bool) {
        self.writes_unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn unavailable() -> ProviderError {
        ProviderError::Unavailable("audit store unavailable".to_string())
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn recent_attempts(
        &self,
        ip: &str,
        email: &str,
        limit: usize,
    ) -> Result<Vec<SigninAttempt>, ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut matching: Vec<SigninAttempt> = self
            .attempts
            .lock()
            .await
            .iter()
            .filter(|attempt| attempt.ip == ip && attempt.email == email)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);

        // Snapshot first so every caller held at the barrier reads the same stale history.
        let barrier = self.read_barrier.lock().await.clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        Ok(matching)
    }

    async fn record_attempt(&self, attempt: &SigninAttempt) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) || self.writes_unavailable.load(Ordering::SeqCst)
        {
            return Err(Self::unavailable());
        }
        self.attempts.lock().await.push(attempt.clone());
        Ok(())
    }
}
