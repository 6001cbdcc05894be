use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{Instrument, debug, info_span, instrument};

use super::{APIKEY_HEADER, SupabaseClient, decode_error, error_message, transport_error};
use crate::auth::{Identity, IdentityProvider, ProviderError, Session};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserRecord,
}

#[derive(Deserialize)]
struct UserRecord {
    id: String,
    email: Option<String>,
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    #[instrument(skip(self, password))]
    async fn verify_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, ProviderError> {
        let url = self.endpoint("auth/v1/token")?;
        let span = info_span!("identity.password_grant", http.method = "POST", url = %url);

        let response = self
            .http
            .post(url)
            .query(&[("grant_type", "password")])
            .header(APIKEY_HEADER, self.service_key.expose_secret())
            .json(&json!({ "email": email, "password": password.expose_secret() }))
            .send()
            .instrument(span)
            .await
            .map_err(|err| transport_error(&err))?;

        let status = response.status();
        if status.is_success() {
            let body: TokenResponse = response.json().await.map_err(|err| decode_error(&err))?;
            return Ok(Session {
                user_id: body.user.id,
                email: body.user.email.unwrap_or_else(|| email.to_string()),
                access_token: SecretString::from(body.access_token),
            });
        }

        if status.is_client_error() {
            let message = error_message(response).await;
            debug!(%status, "password grant rejected");
            return Err(ProviderError::Rejected(message));
        }

        Err(ProviderError::Unavailable(format!(
            "password grant returned {status}"
        )))
    }

    #[instrument(skip(self, token))]
    async fn validate_token(&self, token: &str) -> Result<Option<Identity>, ProviderError> {
        let url = self.endpoint("auth/v1/user")?;
        let span = info_span!("identity.user", http.method = "GET", url = %url);

        let response = self
            .http
            .get(url)
            .header(APIKEY_HEADER, self.service_key.expose_secret())
            .bearer_auth(token)
            .send()
            .instrument(span)
            .await
            .map_err(|err| transport_error(&err))?;

        let status = response.status();
        match status {
            s if s == StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let raw: Value = response.json().await.map_err(|err| decode_error(&err))?;
                let Some(id) = raw["id"].as_str().map(str::to_string) else {
                    return Ok(None);
                };
                Ok(Some(Identity { id, raw }))
            }
            s if s.is_client_error() => Err(ProviderError::Rejected(error_message(response).await)),
            _ => Err(ProviderError::Unavailable(format!(
                "user lookup returned {status}"
            ))),
        }
    }
}
