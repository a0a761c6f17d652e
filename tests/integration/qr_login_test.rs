//! Integration tests for the QR pairing handshake.

mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};

use helpers::{TestApp, str_field};
use storyhub_entity::user::UserStatus;

const EMAIL: &str = "reader@example.com";
const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn test_qr_pairing_delivers_tokens_to_socket() {
    let app = TestApp::new();
    app.create_user(EMAIL, PASSWORD, UserStatus::Active).await;

    let ticket = app
        .request("POST", "/api/auth/qr", Some(json!({"socketId": "sock-1"})), None)
        .await;
    assert_eq!(ticket.status, StatusCode::OK);
    assert_eq!(str_field(ticket.data(), "channel"), "qr-login:sock-1");
    let qr_token = str_field(ticket.data(), "token").to_string();

    let mut waiting = app.pubsub.subscribe("qr-login:sock-1").await;

    let phone = app.login(EMAIL, PASSWORD, "phone").await;
    let scanned = app
        .request(
            "POST",
            "/api/auth/qr/login",
            Some(json!({"token": qr_token, "fingerprint": "living-room-tv"})),
            Some(str_field(&phone, "accessToken")),
        )
        .await;
    assert_eq!(scanned.status, StatusCode::OK);
    assert!(scanned.data().get("accessToken").is_none());

    let payload = waiting.try_recv().expect("event published");
    let event: Value = serde_json::from_str(&payload).expect("event is JSON");
    assert_eq!(event["eventType"], json!("ACCESS_TOKEN_GENERATED"));
    assert_eq!(event["socketId"], json!("sock-1"));
    assert_eq!(event["sessionId"], scanned.data()["id"]);

    let tv_sessions = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&event, "accessToken")))
        .await;
    assert_eq!(tv_sessions.status, StatusCode::OK);
    assert_eq!(tv_sessions.data().as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_qr_login_requires_authenticated_scanner() {
    let app = TestApp::new();
    let ticket = app
        .request("POST", "/api/auth/qr", Some(json!({"socketId": "sock-2"})), None)
        .await;

    let response = app
        .request(
            "POST",
            "/api/auth/qr/login",
            Some(json!({"token": str_field(ticket.data(), "token"), "fingerprint": "tv"})),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_qr_token_publishes_nothing() {
    let app = TestApp::new();
    app.create_user(EMAIL, PASSWORD, UserStatus::Active).await;
    let ticket = app
        .request("POST", "/api/auth/qr", Some(json!({"socketId": "sock-3"})), None)
        .await;
    let mut tampered = str_field(ticket.data(), "token").to_string();
    tampered.push('x');

    let mut waiting = app.pubsub.subscribe("qr-login:sock-3").await;
    let phone = app.login(EMAIL, PASSWORD, "phone").await;

    let response = app
        .request(
            "POST",
            "/api/auth/qr/login",
            Some(json!({"token": tampered, "fingerprint": "tv"})),
            Some(str_field(&phone, "accessToken")),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(waiting.try_recv().is_err());

    let sessions = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&phone, "accessToken")))
        .await;
    assert_eq!(sessions.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_socket_id_length_is_validated() {
    let app = TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/auth/qr",
            Some(json!({"socketId": "s".repeat(129)})),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
