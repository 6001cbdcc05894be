//! Login lockout, bearer-token gateway and the collaborator traits they depend on.
//!
//! ## Lockout
//!
//! Failed logins are counted per `(ip, email)` pair over the 10 most recent audit
//! records. Five failures younger than 30 minutes lock the pair: further attempts get
//! `429` without reaching the identity provider. Both values can be overridden at
//! startup.
//!
//! ## Gateway
//!
//! Every path under `/api/` except the login path requires a bearer token. The gateway
//! returns a [`Passage`]; an authenticated passage carries the [`Principal`] that the
//! downstream handler receives.

mod error;
mod gateway;
mod lockout;
mod login;
pub mod memory;
mod principal;
mod provider;
mod state;
mod utils;

pub use error::{ApiError, ErrorBody};
pub use gateway::{AuthGateway, DEFAULT_LOGIN_PATH, DEFAULT_PROTECTED_PREFIX, Passage, ProtectedRoutes};
pub use lockout::{
    ATTEMPT_PAGE_SIZE, DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_LOCKOUT_WINDOW, LockoutPolicy,
    LockoutTracker, count_recent_failures,
};
pub use login::{LoginHandler, LoginRequest, LoginResponse};
pub use principal::Principal;
pub use provider::{
    AuditStore, Collaborators, Identity, IdentityProvider, Profile, ProfileStore,
    ProviderError, Session, SigninAttempt, Unconfigured,
};
pub use state::{AuthConfig, AuthState};
pub use utils::{extract_bearer_token, extract_client_ip};
