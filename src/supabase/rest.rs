use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use secrecy::ExposeSecret;
use tracing::{Instrument, info_span, instrument};

use super::{APIKEY_HEADER, SupabaseClient, decode_error, error_message, transport_error};
use crate::auth::{AuditStore, Profile, ProfileStore, ProviderError, SigninAttempt};

const PROFILES_TABLE: &str = "rest/v1/profiles";
const SIGNINS_TABLE: &str = "rest/v1/signins";

impl SupabaseClient {
    /// Service-role request against the REST tables.
    fn service(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.service_key.expose_secret();
        builder.header(APIKEY_HEADER, key).bearer_auth(key)
    }
}

async fn ensure_success(response: Response, table: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    Err(ProviderError::Unavailable(format!(
        "{table} returned {status}: {message}"
    )))
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    #[instrument(skip(self))]
    async fn get_profile(&self, identity_id: &str) -> Result<Option<Profile>, ProviderError> {
        let url = self.endpoint(PROFILES_TABLE)?;
        let span = info_span!("db.profiles.select", http.method = "GET", url = %url);
        let filter = format!("eq.{identity_id}");

        let response = self
            .service(self.http.get(url))
            .query(&[
                ("select", "uuid,email,role"),
                ("uuid", filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .instrument(span)
            .await
            .map_err(|err| transport_error(&err))?;

        let rows: Vec<Profile> = ensure_success(response, "profiles")
            .await?
            .json()
            .await
            .map_err(|err| decode_error(&err))?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl AuditStore for SupabaseClient {
    #[instrument(skip(self))]
    async fn recent_attempts(
        &self,
        ip: &str,
        email: &str,
        limit: usize,
    ) -> Result<Vec<SigninAttempt>, ProviderError> {
        let url = self.endpoint(SIGNINS_TABLE)?;
        let span = info_span!("db.signins.select", http.method = "GET", url = %url);
        let ip_filter = format!("eq.{ip}");
        let email_filter = format!("eq.{email}");
        let limit = limit.to_string();

        let response = self
            .service(self.http.get(url))
            .query(&[
                ("select", "email,ip,timestamp,failed"),
                ("ip", ip_filter.as_str()),
                ("email", email_filter.as_str()),
                ("order", "timestamp.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .instrument(span)
            .await
            .map_err(|err| transport_error(&err))?;

        ensure_success(response, "signins")
            .await?
            .json()
            .await
            .map_err(|err| decode_error(&err))
    }

    #[instrument(skip(self, attempt), fields(failed = attempt.failed))]
    async fn record_attempt(&self, attempt: &SigninAttempt) -> Result<(), ProviderError> {
        let url = self.endpoint(SIGNINS_TABLE)?;
        let span = info_span!("db.signins.insert", http.method = "POST", url = %url);

        let response = self
            .service(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(attempt)
            .send()
            .instrument(span)
            .await
            .map_err(|err| transport_error(&err))?;

        ensure_success(response, "signins").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::super::SupabaseConfig;
    use super::*;
    use anyhow::{Context, Result};
    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(server: &MockServer) -> Result<SupabaseClient> {
        let config = SupabaseConfig::new(
            &server.uri(),
            SecretString::from("service-key".to_string()),
            Duration::from_secs(2),
        )?;
        SupabaseClient::new(&config)
    }

    #[tokio::test]
    async fn profile_lookup_filters_by_uuid() -> Result<()> {
        if !can_bind_localhost() {
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("uuid", "eq.user-1"))
            .and(query_param("select", "uuid,email,role"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"uuid": "user-1", "email": "alice@example.com", "role": "admin"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server)?
            .get_profile("user-1")
            .await?
            .context("expected a profile")?;
        assert_eq!(profile.role, "admin");
        Ok(())
    }

    #[tokio::test]
    async fn empty_profile_result_is_none() -> Result<()> {
        if !can_bind_localhost() {
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert_eq!(client(&server)?.get_profile("ghost").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn profile_store_error_is_unavailable() -> Result<()> {
        if !can_bind_localhost() {
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})),
            )
            .mount(&server)
            .await;

        let result = client(&server)?.get_profile("user-1").await;
        assert!(matches!(result, Err(ProviderError::Unavailable(msg)) if msg.contains("boom")));
        Ok(())
    }

    #[tokio::test]
    async fn recent_attempts_query_is_ordered_and_limited() -> Result<()> {
        if !can_bind_localhost() {
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/signins"))
            .and(query_param("ip", "eq.10.0.0.1"))
            .and(query_param("email", "eq.alice@example.com"))
            .and(query_param("order", "timestamp.desc"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "email": "alice@example.com",
                    "ip": "10.0.0.1",
                    "timestamp": "2026-01-01T12:00:00Z",
                    "failed": true
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let attempts = client(&server)?
            .recent_attempts("10.0.0.1", "alice@example.com", 10)
            .await?;
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].failed);
        assert_eq!(
            attempts[0].timestamp,
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().context("timestamp")?
        );
        Ok(())
    }

    #[tokio::test]
    async fn record_attempt_posts_row() -> Result<()> {
        if !can_bind_localhost() {
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/signins"))
            .and(header("prefer", "return=minimal"))
            .and(body_json(json!({
                "email": "alice@example.com",
                "ip": "10.0.0.1",
                "timestamp": "2026-01-01T12:00:00Z",
                "failed": false
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let attempt = SigninAttempt {
            email: "alice@example.com".to_string(),
            ip: "10.0.0.1".to_string(),
            timestamp: Utc
                .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
                .single()
                .context("timestamp")?,
            failed: false,
        };
        client(&server)?.record_attempt(&attempt).await?;
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() -> Result<()> {
        let config = SupabaseConfig::new(
            "http://127.0.0.1:1",
            SecretString::from("service-key".to_string()),
            Duration::from_secs(1),
        )?;
        let result = SupabaseClient::new(&config)?
            .recent_attempts("10.0.0.1", "alice@example.com", 10)
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Unavailable(_) | ProviderError::Timeout)
        ));
        Ok(())
    }
}
