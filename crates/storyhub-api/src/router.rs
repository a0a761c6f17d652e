//! Route table.

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::handlers::{account, auth, health, otp, qr};
use crate::state::AppState;

/// Builds the application router with every route bound to `state`.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/sessions", get(auth::list_sessions))
        .route("/sessions/{id}", delete(auth::delete_session))
        .route("/device/token", post(auth::device_token))
        .route("/device", put(auth::update_device))
        .route("/otp", post(otp::request_otp))
        .route("/otp/confirm", post(otp::confirm_otp))
        .route("/qr", post(qr::issue_token))
        .route("/qr/login", post(qr::login))
        .route("/password/forgot", post(account::forgot_password))
        .route("/password/reset", post(account::reset_password))
        .route(
            "/email/verification",
            post(account::request_email_confirmation),
        )
        .route("/email/confirm", post(account::confirm_email));

    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api/auth", auth_routes)
        .with_state(state)
}
