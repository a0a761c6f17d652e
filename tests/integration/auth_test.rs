//! Integration tests for login, refresh rotation, logout, and password reset.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{TestApp, str_field};
use storyhub_auth::TokenType;
use storyhub_entity::user::UserStatus;

const EMAIL: &str = "reader@example.com";
const PASSWORD: &str = "correct horse battery";

async fn app_with_user() -> TestApp {
    let app = TestApp::new();
    app.create_user(EMAIL, PASSWORD, UserStatus::Active).await;
    app
}

#[tokio::test]
async fn test_login_success() {
    let app = app_with_user().await;
    let data = app.login(EMAIL, PASSWORD, "laptop").await;

    assert!(!str_field(&data, "accessToken").is_empty());
    assert!(!str_field(&data, "refreshToken").is_empty());
    assert_eq!(str_field(&data, "sessionId"), str_field(&data["session"], "id"));
    assert_eq!(data["session"]["current"], json!(true));
    assert!(data["session"].get("refreshTokenHash").is_none());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app_with_user().await;

    let wrong_password = app
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({"email": EMAIL, "password": "nope", "fingerprint": "fp"})),
            None,
        )
        .await;
    let unknown_user = app
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({"email": "nobody@example.com", "password": "nope", "fingerprint": "fp"})),
            None,
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = app_with_user().await;
    let login = app.login(EMAIL, PASSWORD, "laptop").await;
    let old_refresh = str_field(&login, "refreshToken");

    let refreshed = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(json!({"refreshToken": old_refresh, "fingerprint": "laptop"})),
            None,
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let data = refreshed.data();
    assert_ne!(str_field(data, "refreshToken"), old_refresh);
    assert_ne!(str_field(data, "sessionId"), str_field(&login, "sessionId"));

    let sessions = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(data, "accessToken")))
        .await;
    assert_eq!(sessions.status, StatusCode::OK);
    assert_eq!(sessions.data().as_array().map(Vec::len), Some(1));

    let stale_access = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&login, "accessToken")))
        .await;
    assert_eq!(stale_access.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_replay_revokes_all_sessions() {
    let app = app_with_user().await;
    let login = app.login(EMAIL, PASSWORD, "laptop").await;
    let first = str_field(&login, "refreshToken").to_string();

    let rotated = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(json!({"refreshToken": first, "fingerprint": "laptop"})),
            None,
        )
        .await;
    assert_eq!(rotated.status, StatusCode::OK);
    let second = str_field(rotated.data(), "refreshToken").to_string();

    let replay = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(json!({"refreshToken": first, "fingerprint": "laptop"})),
            None,
        )
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

    let after_replay = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(json!({"refreshToken": second, "fingerprint": "laptop"})),
            None,
        )
        .await;
    assert_eq!(after_replay.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_wrong_fingerprint_burns_session() {
    let app = app_with_user().await;
    let login = app.login(EMAIL, PASSWORD, "laptop").await;
    let refresh = str_field(&login, "refreshToken");

    let stolen = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(json!({"refreshToken": refresh, "fingerprint": "attacker"})),
            None,
        )
        .await;
    assert_eq!(stolen.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stolen.body["message"], json!("Authentication failed"));

    let legitimate = app
        .request(
            "POST",
            "/api/auth/refresh",
            Some(json!({"refreshToken": refresh, "fingerprint": "laptop"})),
            None,
        )
        .await;
    assert_eq!(legitimate.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = app_with_user().await;
    let login = app.login(EMAIL, PASSWORD, "laptop").await;
    let body = json!({"refreshToken": str_field(&login, "refreshToken")});

    let first = app
        .request("POST", "/api/auth/logout", Some(body.clone()), None)
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data()["sessionsInvalidated"], json!(1));
    assert_eq!(first.data()["alreadyInvalidated"], json!(false));

    let second = app.request("POST", "/api/auth/logout", Some(body), None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.data()["sessionsInvalidated"], json!(0));
    assert_eq!(second.data()["alreadyInvalidated"], json!(true));

    let access = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&login, "accessToken")))
        .await;
    assert_eq!(access.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_devices() {
    let app = app_with_user().await;
    let laptop = app.login(EMAIL, PASSWORD, "laptop").await;
    let phone = app.login(EMAIL, PASSWORD, "phone").await;
    app.login(EMAIL, PASSWORD, "tablet").await;

    let response = app
        .request(
            "POST",
            "/api/auth/logout",
            Some(json!({"refreshToken": str_field(&laptop, "refreshToken"), "allDevices": true})),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["sessionsInvalidated"], json!(3));

    let phone_access = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&phone, "accessToken")))
        .await;
    assert_eq!(phone_access.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_own_session() {
    let app = app_with_user().await;
    let laptop = app.login(EMAIL, PASSWORD, "laptop").await;
    let phone = app.login(EMAIL, PASSWORD, "phone").await;
    let token = str_field(&laptop, "accessToken");

    let listed = app.request("GET", "/api/auth/sessions", None, Some(token)).await;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(2));

    let uri = format!("/api/auth/sessions/{}", str_field(&phone, "sessionId"));
    let deleted = app.request("DELETE", &uri, None, Some(token)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.data()["sessionsInvalidated"], json!(1));

    let listed = app.request("GET", "/api/auth/sessions", None, Some(token)).await;
    let sessions = listed.data().as_array().cloned().unwrap_or_default();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["current"], json!(true));
}

#[tokio::test]
async fn test_cannot_delete_another_users_session() {
    let app = app_with_user().await;
    app.create_user("writer@example.com", PASSWORD, UserStatus::Active)
        .await;
    let reader = app.login(EMAIL, PASSWORD, "laptop").await;
    let writer = app.login("writer@example.com", PASSWORD, "desk").await;

    let uri = format!("/api/auth/sessions/{}", str_field(&writer, "sessionId"));
    let response = app
        .request("DELETE", &uri, None, Some(str_field(&reader, "accessToken")))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let still_valid = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&writer, "accessToken")))
        .await;
    assert_eq!(still_valid.status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_logs_out_everywhere() {
    let app = app_with_user().await;
    let login = app.login(EMAIL, PASSWORD, "laptop").await;

    let forgot = app
        .request("POST", "/api/auth/password/forgot", Some(json!({"email": EMAIL})), None)
        .await;
    assert_eq!(forgot.status, StatusCode::OK);
    let token = app
        .notifier
        .last_account_token(EMAIL, TokenType::ResetPassword)
        .expect("reset token sent");

    let reset = app
        .request(
            "POST",
            "/api/auth/password/reset",
            Some(json!({"token": token, "newPassword": "a brand new passphrase"})),
            None,
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.data()["sessionsInvalidated"], json!(1));

    let old_access = app
        .request("GET", "/api/auth/sessions", None, Some(str_field(&login, "accessToken")))
        .await;
    assert_eq!(old_access.status, StatusCode::UNAUTHORIZED);

    app.login(EMAIL, "a brand new passphrase", "laptop").await;

    let replay = app
        .request(
            "POST",
            "/api/auth/password/reset",
            Some(json!({"token": token, "newPassword": "someone else's passphrase"})),
            None,
        )
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    app.login(EMAIL, "a brand new passphrase", "phone").await;
}

#[tokio::test]
async fn test_forgot_password_for_unknown_email_succeeds_silently() {
    let app = app_with_user().await;
    let response = app
        .request(
            "POST",
            "/api/auth/password/forgot",
            Some(json!({"email": "ghost@example.com"})),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        app.notifier
            .last_account_token("ghost@example.com", TokenType::ResetPassword)
            .is_none()
    );
}

#[tokio::test]
async fn test_device_update_flow() {
    let app = app_with_user().await;
    let login = app.login(EMAIL, PASSWORD, "laptop").await;
    let access = str_field(&login, "accessToken");

    let grant = app
        .request("POST", "/api/auth/device/token", None, Some(access))
        .await;
    assert_eq!(grant.status, StatusCode::OK);

    let updated = app
        .request(
            "PUT",
            "/api/auth/device",
            Some(json!({
                "token": str_field(grant.data(), "token"),
                "deviceInfo": {"deviceType": "desktop", "os": "Linux"},
            })),
            None,
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["deviceInfo"]["os"], json!("Linux"));
}
