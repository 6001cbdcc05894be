//! Supabase-compatible backend for the collaborator traits.
//!
//! - Identity: the `auth/v1` endpoints (password grant and `/user`).
//! - Profiles and sign-in attempts: `rest/v1` tables `profiles` and `signins`.
//!
//! Every request carries the service key in `apikey` and uses one shared `reqwest`
//! client whose timeout bounds each call.

mod identity;
mod rest;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use url::Url;

use crate::auth::{Collaborators, ProviderError};

const APIKEY_HEADER: &str = "apikey";

/// Provider endpoint and service credential.
#[derive(Clone)]
pub struct SupabaseConfig {
    url: Url,
    service_key: SecretString,
    timeout: Duration,
}

impl SupabaseConfig {
    /// # Errors
    /// Returns an error if `url` is not an absolute http(s) URL.
    pub fn new(url: &str, service_key: SecretString, timeout: Duration) -> Result<Self> {
        let mut url = Url::parse(url).with_context(|| format!("Invalid provider URL: {url}"))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(anyhow!("Unsupported provider URL scheme: {scheme}")),
        }
        // Keep a trailing slash so relative joins append instead of replacing.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            url,
            service_key,
            timeout,
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("service_key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct SupabaseClient {
    http: Client,
    base: Url,
    service_key: SecretString,
}

impl SupabaseClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build provider HTTP client")?;
        Ok(Self {
            http,
            base: config.url.clone(),
            service_key: config.service_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base
            .join(path)
            .map_err(|err| ProviderError::Unavailable(format!("invalid endpoint {path}: {err}")))
    }
}

/// Build the collaborators; `None` yields the fail-closed unconfigured set.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn collaborators(config: Option<&SupabaseConfig>) -> Result<Collaborators> {
    let Some(config) = config else {
        return Ok(Collaborators::unconfigured());
    };
    let client = Arc::new(SupabaseClient::new(config)?);
    Ok(Collaborators::new(client.clone(), client.clone(), client))
}

fn transport_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Unavailable(err.to_string())
    }
}

fn decode_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Decode(err.to_string())
    }
}

/// Human-readable message from an error response, across the auth and rest formats.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body[*key].as_str())
        .map_or_else(|| status.to_string(), str::to_string)
}
