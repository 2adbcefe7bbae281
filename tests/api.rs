//! End-to-end API tests running the full router against the in-memory store.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use zaguan::api::handlers::auth::{
    AuthConfig, AuthState, DisabledProvider, LoginThrottle, NoopBotCheck, ThrottleConfig,
    TokenSigner,
};
use zaguan::api::{app, LogMailer};
use zaguan::storage::MemoryUserStore;

fn test_app() -> Router {
    let config = AuthConfig::new("https://portal.example.com".to_string());
    let state = Arc::new(AuthState::new(
        config,
        Arc::new(MemoryUserStore::new()),
        TokenSigner::new(SecretString::from("integration-secret")),
        Arc::new(LoginThrottle::new(ThrottleConfig::default())),
        Arc::new(LogMailer),
        Arc::new(NoopBotCheck),
        Arc::new(DisabledProvider),
    ));
    app(state)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Result<Request<Body>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(serde_json::to_vec(body)?))
        .context("failed to build request")
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .context("request failed")?;
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .context("failed to collect body")?
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("body is not JSON")?
    };
    Ok((status, value))
}

#[tokio::test]
async fn health_reports_ok_and_app_header() -> Result<()> {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .context("request build failed")?,
        )
        .await
        .context("request failed")?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn register_login_me_flow() -> Result<()> {
    let app = test_app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/auth/register",
            &json!({
                "email": "Ada@Example.com",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "password": "correct horse"
            }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "USER");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/auth/login",
            &json!({ "email": "ada@example.com", "password": "correct horse" }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().context("missing token")?.to_string();

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/v1/me")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .context("request build failed")?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn lockout_after_repeated_failures() -> Result<()> {
    let app = test_app();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/v1/auth/register",
            &json!({
                "email": "ada@example.com",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "password": "correct horse"
            }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    for _ in 0..5 {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/v1/auth/login",
                &json!({ "email": "ada@example.com", "password": "wrong" }),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/auth/login",
            &json!({ "email": "ada@example.com", "password": "correct horse" }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["retry_after_minutes"], 15);
    Ok(())
}

#[tokio::test]
async fn unauthenticated_me_is_rejected() -> Result<()> {
    let app = test_app();
    let (status, _) = send(
        &app,
        Request::builder()
            .uri("/v1/me")
            .body(Body::empty())
            .context("request build failed")?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn external_status_defaults_to_disabled() -> Result<()> {
    let app = test_app();
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/v1/auth/external/status")
            .body(Body::empty())
            .context("request build failed")?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    Ok(())
}

#[tokio::test]
async fn external_callback_redirects_when_disabled() -> Result<()> {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/auth/external/callback?code=abc")
                .body(Body::empty())
                .context("request build failed")?,
        )
        .await
        .context("request failed")?;
    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .context("missing location header")?;
    assert_eq!(
        location,
        "https://portal.example.com/login?error=external-auth-disabled"
    );
    Ok(())
}
