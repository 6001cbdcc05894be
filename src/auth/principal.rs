//! Authenticated principal produced by the gateway.

use super::provider::{Identity, Profile};

/// Identity attached to a protected request after token validation.
///
/// Built per request from the profile store; never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Principal {
    pub uuid: String,
    pub email: String,
    pub role: String,
    /// Raw identity-provider subject the profile was resolved from.
    pub subject: Option<Identity>,
}

impl Principal {
    #[must_use]
    pub fn from_profile(profile: Profile, subject: Identity) -> Self {
        Self {
            uuid: profile.uuid,
            email: profile.email,
            role: profile.role,
            subject: Some(subject),
        }
    }
}
