//! Auth configuration and the state shared by the HTTP handlers.

use std::time::Duration;

use super::gateway::{AuthGateway, ProtectedRoutes};
use super::lockout::LockoutPolicy;
use super::login::LoginHandler;
use super::provider::Collaborators;

const DEFAULT_CALL_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    lockout: LockoutPolicy,
    routes: ProtectedRoutes,
    call_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            routes: ProtectedRoutes::default(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_lockout_policy(mut self, policy: LockoutPolicy) -> Self {
        self.lockout = policy;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn lockout_policy(&self) -> LockoutPolicy {
        self.lockout
    }

    #[must_use]
    pub fn routes(&self) -> &ProtectedRoutes {
        &self.routes
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

pub struct AuthState {
    login: LoginHandler,
    gateway: AuthGateway,
    provider_configured: bool,
}

impl AuthState {
    #[must_use]
    pub fn new(config: &AuthConfig, collaborators: Collaborators) -> Self {
        let login = LoginHandler::new(
            collaborators.identity.clone(),
            collaborators.audit.clone(),
            config.lockout_policy(),
            config.call_timeout(),
        );
        let gateway = AuthGateway::new(
            collaborators.identity.clone(),
            collaborators.profiles.clone(),
            config.routes().clone(),
            config.call_timeout(),
        );
        Self {
            login,
            gateway,
            provider_configured: collaborators.is_configured(),
        }
    }

    #[must_use]
    pub fn login(&self) -> &LoginHandler {
        &self.login
    }

    #[must_use]
    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    #[must_use]
    pub fn provider_configured(&self) -> bool {
        self.provider_configured
    }
}
