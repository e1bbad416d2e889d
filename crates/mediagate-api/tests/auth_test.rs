//! Token issuance and the auth middleware, end to end.
//!
//! Run with: `cargo test -p mediagate-api --test auth_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{login, session_cookie, setup_test_app, COOKIE_NAME};
use mediagate_api::ErrorResponse;

/// Flip one character in the middle of the payload segment.
fn tamper(token: &str) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);
    let mut payload: Vec<char> = parts[1].chars().collect();
    let mid = payload.len() / 2;
    payload[mid] = if payload[mid] == 'A' { 'B' } else { 'A' };
    let payload: String = payload.into_iter().collect();
    format!("{}.{}.{}", parts[0], payload, parts[2])
}

#[tokio::test]
async fn test_authenticate_sets_cookie_and_returns_token() {
    let app = setup_test_app();
    let client = app.client();

    let response = client
        .post("/authenticate")
        .json(&serde_json::json!({ "username": "alice" }))
        .await;
    response.assert_status_ok();

    let token = response.json::<String>();
    assert!(!token.is_empty());

    let cookie = response.cookie(COOKIE_NAME);
    assert_eq!(cookie.value(), token);
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
    let expires = cookie
        .expires_datetime()
        .expect("cookie carries an expiry");
    assert!(expires > time::OffsetDateTime::now_utc());

    assert!(app.tokens.verify(&token).is_some());
}

#[tokio::test]
async fn test_secure_requires_valid_cookie() {
    let app = setup_test_app();
    let client = app.client();
    let token = login(client, "alice").await;

    let response = client
        .get("/secure")
        .add_header("Cookie", session_cookie(&token))
        .await;
    response.assert_status_ok();
    response.assert_text("Secure msg from gopro service");

    client.get("/secure").await.assert_status_unauthorized();

    client
        .get("/secure")
        .add_header("Cookie", session_cookie(&tamper(&token)))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_token_accepted_from_headers() {
    let app = setup_test_app();
    let client = app.client();
    let token = app.token_for("bob");

    client
        .get("/secure")
        .add_header("Authorization", format!("Bearer {}", token))
        .await
        .assert_status_ok();
    client
        .get("/secure")
        .add_header("pro_token", token.clone())
        .await
        .assert_status_ok();
    client
        .get("/secure")
        .add_header("user_token", token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_auth_failure_body_is_uniform() {
    let app = setup_test_app();
    let client = app.client();
    let token = app.token_for("alice");

    let missing = client.get("/media").await;
    let tampered = client
        .get("/media")
        .add_header("Cookie", session_cookie(&tamper(&token)))
        .await;

    for response in [missing, tampered] {
        response.assert_status_unauthorized();
        let body = response.json::<ErrorResponse>();
        assert_eq!(body.error, "no or wrong token found in header");
        assert_eq!(body.status, 523);
        assert!(body.details.is_none());
    }
}

#[tokio::test]
async fn test_token_from_another_instance_rejected() {
    let first = setup_test_app();
    let second = setup_test_app();
    let foreign = first.token_for("alice");

    second
        .client()
        .get("/secure")
        .add_header("Cookie", session_cookie(&foreign))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_authenticate_rejects_bad_bodies() {
    let app = setup_test_app();
    let client = app.client();

    let malformed = client
        .post("/authenticate")
        .bytes(bytes::Bytes::from_static(b"{\"username\":"))
        .content_type("application/json")
        .await;
    malformed.assert_status_bad_request();
    assert!(malformed.maybe_cookie(COOKIE_NAME).is_none());

    client
        .post("/authenticate")
        .json(&serde_json::json!({ "username": "   " }))
        .await
        .assert_status_bad_request();

    client
        .post("/authenticate")
        .text("alice")
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_reauthenticate_extends_session() {
    let app = setup_test_app();
    let client = app.client();
    let token = login(client, "alice").await;
    let first = app.tokens.verify(&token).unwrap();

    let response = client
        .get("/reauthenticate")
        .add_header("Cookie", session_cookie(&token))
        .await;
    response.assert_status_ok();

    let refreshed = response.json::<String>();
    assert_eq!(response.cookie(COOKIE_NAME).value(), refreshed);

    let second = app.tokens.verify(&refreshed).unwrap();
    assert_eq!(second.identity, "alice");
    assert!(second.expires_at > first.expires_at);

    client
        .get("/reauthenticate")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let app = setup_test_app();
    let client = app.client();

    let root = client.get("/").await;
    root.assert_status(StatusCode::from_u16(425).unwrap());
    root.assert_text("Nothing to see here :-)");

    client.get("/openapi.json").await.assert_status_ok();
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = setup_test_app();
    let response = app
        .client()
        .get("/")
        .add_header("X-Request-ID", "trace-me")
        .await;

    assert_eq!(response.header("X-Request-ID"), "trace-me");
    assert_eq!(response.header("X-Content-Type-Options"), "nosniff");
    assert_eq!(response.header("X-Frame-Options"), "DENY");
}
