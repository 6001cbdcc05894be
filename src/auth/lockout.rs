//! Brute-force lockout accounting per `(ip, email)` pair.
//!
//! Flow Overview:
//! 1) Fetch the most recent attempts for the pair (newest first, bounded page).
//! 2) Count failures younger than the window.
//! 3) The caller compares the count against the threshold.
//!
//! Only the fetched page is inspected: failures older than the page are not counted even
//! when they fall inside the window.

use chrono::{DateTime, TimeDelta, Utc};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

use super::provider::{AuditStore, ProviderError, SigninAttempt, bounded};

pub const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_LOCKOUT_THRESHOLD: usize = 5;
/// Attempts fetched per lockout evaluation.
pub const ATTEMPT_PAGE_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    window: Duration,
    threshold: usize,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_LOCKOUT_WINDOW,
            threshold: DEFAULT_LOCKOUT_THRESHOLD,
        }
    }
}

impl LockoutPolicy {
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn is_locked(&self, failures: usize) -> bool {
        failures >= self.threshold
    }
}

/// Count failed attempts younger than `window`, looking at the first page only.
#[must_use]
pub fn count_recent_failures(
    attempts: &[SigninAttempt],
    now: DateTime<Utc>,
    window: Duration,
) -> usize {
    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
    attempts
        .iter()
        .take(ATTEMPT_PAGE_SIZE)
        .filter(|attempt| attempt.failed && now.signed_duration_since(attempt.timestamp) < window)
        .count()
}

pub struct LockoutTracker {
    store: Arc<dyn AuditStore>,
    policy: LockoutPolicy,
    call_timeout: Duration,
}

impl LockoutTracker {
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, policy: LockoutPolicy, call_timeout: Duration) -> Self {
        Self {
            store,
            policy,
            call_timeout,
        }
    }

    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Recent failures for the pair.
    ///
    /// # Errors
    /// Returns the audit store fault, or `ProviderError::Timeout` when the lookup expires.
    #[instrument(skip(self))]
    pub async fn recent_failures(&self, ip: &str, email: &str) -> Result<usize, ProviderError> {
        let attempts = bounded(
            self.call_timeout,
            self.store.recent_attempts(ip, email, ATTEMPT_PAGE_SIZE),
        )
        .await?;
        let failures = count_recent_failures(&attempts, Utc::now(), self.policy.window);
        debug!(fetched = attempts.len(), failures, "lockout evaluated");
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::InMemoryAuditStore;
    use anyhow::Result;

    fn attempt(minutes_ago: i64, failed: bool, now: DateTime<Utc>) -> SigninAttempt {
        SigninAttempt {
            email: "alice@example.com".to_string(),
            ip: "10.0.0.1".to_string(),
            timestamp: now - TimeDelta::minutes(minutes_ago),
            failed,
        }
    }

    #[test]
    fn policy_defaults_and_overrides() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.window(), Duration::from_secs(1800));
        assert_eq!(policy.threshold(), 5);
        assert!(!policy.is_locked(4));
        assert!(policy.is_locked(5));

        let policy = policy
            .with_window(Duration::from_secs(60))
            .with_threshold(2);
        assert_eq!(policy.window(), Duration::from_secs(60));
        assert!(policy.is_locked(2));
    }

    #[test]
    fn counts_only_failures_inside_window() {
        let now = Utc::now();
        let attempts = vec![
            attempt(1, true, now),
            attempt(2, false, now),
            attempt(29, true, now),
            attempt(30, true, now),
            attempt(45, true, now),
        ];
        assert_eq!(
            count_recent_failures(&attempts, now, DEFAULT_LOCKOUT_WINDOW),
            2
        );
    }

    #[test]
    fn ignores_records_beyond_first_page() {
        let now = Utc::now();
        let mut attempts: Vec<SigninAttempt> = (0..10).map(|_| attempt(1, false, now)).collect();
        attempts.extend((0..5).map(|_| attempt(1, true, now)));
        assert_eq!(
            count_recent_failures(&attempts, now, DEFAULT_LOCKOUT_WINDOW),
            0
        );
    }

    #[test]
    fn empty_history_counts_zero() {
        assert_eq!(
            count_recent_failures(&[], Utc::now(), DEFAULT_LOCKOUT_WINDOW),
            0
        );
    }

    #[tokio::test]
    async fn tracker_scopes_count_to_pair() -> Result<()> {
        let store = Arc::new(InMemoryAuditStore::new());
        let now = Utc::now();
        for _ in 0..3 {
            store.push(attempt(1, true, now)).await;
        }
        store
            .push(SigninAttempt {
                ip: "10.0.0.2".to_string(),
                ..attempt(1, true, now)
            })
            .await;
        store
            .push(SigninAttempt {
                email: "bob@example.com".to_string(),
                ..attempt(1, true, now)
            })
            .await;

        let tracker = LockoutTracker::new(
            store.clone(),
            LockoutPolicy::default(),
            Duration::from_secs(1),
        );
        assert_eq!(
            tracker
                .recent_failures("10.0.0.1", "alice@example.com")
                .await?,
            3
        );
        assert_eq!(
            tracker
                .recent_failures("10.0.0.3", "alice@example.com")
                .await?,
            0
        );
        Ok(())
    }

    #[tokio::test]
    async fn tracker_surfaces_store_faults() {
        let store = Arc::new(InMemoryAuditStore::new());
        store.set_unavailable(true);
        let tracker = LockoutTracker::new(store, LockoutPolicy::default(), Duration::from_secs(1));
        let result = tracker
            .recent_failures("10.0.0.1", "alice@example.com")
            .await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }
}
