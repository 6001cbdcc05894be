//! End-to-end run of the server against a mocked Supabase project.
//!
//! The gateway listens on an ephemeral port with connect info enabled, so the socket
//! peer address is what keys the lockout.

use anyhow::{Context, Result};
use authgate::{
    api,
    auth::{AuthConfig, AuthState},
    supabase::{self, SupabaseConfig},
};
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

async fn spawn_gateway(provider: &MockServer) -> Result<SocketAddr> {
    let config = SupabaseConfig::new(
        &provider.uri(),
        SecretString::from("service-key".to_string()),
        Duration::from_secs(2),
    )?;
    let collaborators = supabase::collaborators(Some(&config))?;
    let state = Arc::new(AuthState::new(&AuthConfig::new(), collaborators));
    let app = api::app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });
    Ok(addr)
}

#[tokio::test]
async fn login_and_me_against_supabase() -> Result<()> {
    if !can_bind_localhost() {
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/signins"))
        .and(query_param("ip", "eq.127.0.0.1"))
        .and(query_param("email", "eq.alice@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-abc",
            "user": {"id": "user-1", "email": "alice@example.com"}
        })))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/signins"))
        .and(body_partial_json(json!({
            "email": "alice@example.com",
            "ip": "127.0.0.1",
            "failed": false
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer jwt-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": "alice@example.com"
        })))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("uuid", "eq.user-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"uuid": "user-1", "email": "alice@example.com", "role": "member"}
        ])))
        .expect(1)
        .mount(&provider)
        .await;

    let addr = spawn_gateway(&provider).await?;
    let client = reqwest::Client::builder().no_proxy().build()?;

    let response = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "alice@example.com", "password": "pw"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["token"], "Bearer jwt-abc");
    let token = body["token"].as_str().context("token")?.to_string();

    let response = client
        .get(format!("http://{addr}/api/auth/me"))
        .header("authorization", token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({"uuid": "user-1", "email": "alice@example.com", "role": "member"})
    );

    provider.verify().await;
    Ok(())
}

#[tokio::test]
async fn provider_rejection_is_recorded_as_failure() -> Result<()> {
    if !can_bind_localhost() {
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/signins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/signins"))
        .and(body_partial_json(json!({"failed": true})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&provider)
        .await;

    let addr = spawn_gateway(&provider).await?;
    let response = reqwest::Client::builder()
        .no_proxy()
        .build()?
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "alice@example.com", "password": "nope"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({"message": "Invalid login credentials", "error": true})
    );

    provider.verify().await;
    Ok(())
}
