//! Integration tests for one-time passcode registration and contact changes.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{TestApp, str_field};
use storyhub_database::UserDirectory;
use storyhub_entity::user::UserStatus;

const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn test_registration_activates_and_logs_in() {
    let app = TestApp::new();
    let user = app
        .create_user("new@example.com", PASSWORD, UserStatus::Pending)
        .await;

    let requested = app
        .request(
            "POST",
            "/api/auth/otp",
            Some(json!({"subject": "new@example.com", "purpose": "registration"})),
            None,
        )
        .await;
    assert_eq!(requested.status, StatusCode::OK);
    let code = app.notifier.last_otp("new@example.com").expect("code sent");

    let confirmed = app
        .request(
            "POST",
            "/api/auth/otp/confirm",
            Some(json!({
                "code": code,
                "subject": "new@example.com",
                "purpose": "registration",
                "fingerprint": "phone",
            })),
            None,
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.data()["outcome"], json!("registered"));
    assert!(!str_field(&confirmed.data()["login"], "accessToken").is_empty());

    let stored = app.users.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.status, UserStatus::Active);
    assert!(stored.email_verified);
}

#[tokio::test]
async fn test_registration_code_not_sent_for_unknown_address() {
    let app = TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/auth/otp",
            Some(json!({"subject": "ghost@example.com", "purpose": "registration"})),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.notifier.otp_count(), 0);
}

#[tokio::test]
async fn test_failed_attempts_are_rate_limited() {
    let app = TestApp::new();
    app.create_user("new@example.com", PASSWORD, UserStatus::Pending)
        .await;
    let body = json!({
        "code": "abcdef",
        "subject": "new@example.com",
        "purpose": "registration",
        "fingerprint": "phone",
    });

    for _ in 0..app.config.otp.max_attempts {
        let response = app
            .request("POST", "/api/auth/otp/confirm", Some(body.clone()), None)
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let limited = app
        .request("POST", "/api/auth/otp/confirm", Some(body), None)
        .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_email_change_requires_authentication() {
    let app = TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/auth/otp/confirm",
            Some(json!({
                "code": "123456",
                "subject": "other@example.com",
                "purpose": "email_change",
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_email_change_with_code() {
    let app = TestApp::new();
    let user = app
        .create_user("old@example.com", PASSWORD, UserStatus::Active)
        .await;
    let login = app.login("old@example.com", PASSWORD, "laptop").await;
    let access = str_field(&login, "accessToken");

    let requested = app
        .request(
            "POST",
            "/api/auth/otp",
            Some(json!({"subject": "fresh@example.com", "purpose": "email_change"})),
            Some(access),
        )
        .await;
    assert_eq!(requested.status, StatusCode::OK);
    let code = app.notifier.last_otp("fresh@example.com").expect("code sent");

    let confirmed = app
        .request(
            "POST",
            "/api/auth/otp/confirm",
            Some(json!({
                "code": code,
                "subject": "fresh@example.com",
                "purpose": "email_change",
            })),
            Some(access),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.data()["outcome"], json!("email_changed"));

    let stored = app.users.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.email, "fresh@example.com");
    app.login("fresh@example.com", PASSWORD, "laptop").await;
}

#[tokio::test]
async fn test_code_for_one_purpose_rejected_for_another() {
    let app = TestApp::new();
    app.create_user("old@example.com", PASSWORD, UserStatus::Active)
        .await;
    app.create_user("new@example.com", PASSWORD, UserStatus::Pending)
        .await;
    let login = app.login("old@example.com", PASSWORD, "laptop").await;

    app.request(
        "POST",
        "/api/auth/otp",
        Some(json!({"subject": "new@example.com", "purpose": "registration"})),
        None,
    )
    .await;
    let code = app.notifier.last_otp("new@example.com").expect("code sent");

    let response = app
        .request(
            "POST",
            "/api/auth/otp/confirm",
            Some(json!({
                "code": code,
                "subject": "new@example.com",
                "purpose": "email_change",
            })),
            Some(str_field(&login, "accessToken")),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
