//! # authgate
//!
//! `authgate` fronts a set of protected API routes. It does two things:
//!
//! - **Login** (`POST /api/auth/login`): verifies an email/password pair against the
//!   identity provider, with a brute-force lockout per `(ip, email)` pair. Every attempt
//!   that reaches the provider is appended to the audit store; once the recent failures
//!   reach the threshold the endpoint answers `429` without calling the provider.
//! - **Gateway**: every other request under the protected prefix must carry
//!   `Authorization: Bearer <token>`. The token is validated with the identity provider,
//!   the profile is resolved, and the resulting [`auth::Principal`] is handed to the
//!   downstream handler.
//!
//! ## Lockout race
//!
//! Counting recent failures and recording a new attempt are two separate store calls.
//! Concurrent attempts for the same pair may each observe a count below the threshold,
//! so the effective threshold can be exceeded under concurrency. This is accepted.
//!
//! ## Error bodies
//!
//! All errors share the `{"message": "...", "error": true}` shape. Messages never reveal
//! whether an email address is registered.

pub mod api;
pub mod auth;
pub mod cli;
pub mod supabase;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
