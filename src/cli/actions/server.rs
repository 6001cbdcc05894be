use crate::{
    api,
    auth::{AuthConfig, AuthState, Collaborators, LockoutPolicy},
    supabase::{self, SupabaseConfig},
};
use anyhow::Result;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

pub struct Args {
    pub port: u16,
    pub provider_url: Option<String>,
    pub provider_service_key: Option<SecretString>,
    pub provider_timeout_seconds: u64,
    pub lockout_window_seconds: u64,
    pub lockout_threshold: usize,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("provider_url", &self.provider_url)
            .field(
                "provider_service_key",
                &self.provider_service_key.as_ref().map(|_| "***"),
            )
            .field("provider_timeout_seconds", &self.provider_timeout_seconds)
            .field("lockout_window_seconds", &self.lockout_window_seconds)
            .field("lockout_threshold", &self.lockout_threshold)
            .finish()
    }
}

impl Args {
    fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_seconds)
    }

    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_lockout_policy(
                LockoutPolicy::default()
                    .with_window(Duration::from_secs(self.lockout_window_seconds))
                    .with_threshold(self.lockout_threshold),
            )
            .with_call_timeout(self.call_timeout())
    }

    /// `None` when either the URL or the key is missing.
    fn provider_config(&self) -> Result<Option<SupabaseConfig>> {
        match (&self.provider_url, &self.provider_service_key) {
            (Some(url), Some(key)) => Ok(Some(SupabaseConfig::new(
                url,
                key.clone(),
                self.call_timeout(),
            )?)),
            _ => Ok(None),
        }
    }

    fn collaborators(&self) -> Result<Collaborators> {
        let provider = self.provider_config()?;
        if provider.is_none() {
            warn!(
                "Identity provider URL or service key is missing; login and protected routes will answer 500"
            );
        }
        supabase::collaborators(provider.as_ref())
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Starting server with {:?}", args);

    let state = Arc::new(AuthState::new(&args.auth_config(), args.collaborators()?));

    api::new(args.port, state).await
}
