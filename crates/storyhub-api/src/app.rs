//! Application builder: wires services into state and state into an Axum
//! app.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use storyhub_auth::{
    AccountService, AccountTokens, Notifier, OtpService, PasswordHasher, SecurityValidator,
    SessionManager, SessionStore, TokenCodecs,
};
use storyhub_cache::CacheManager;
use storyhub_core::config::AppConfig;
use storyhub_core::result::AppResult;
use storyhub_core::traits::{IpReputation, PubSub};
use storyhub_database::{SessionRepository, UserDirectory};
use storyhub_realtime::QrLoginBroker;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Collaborators the session subsystem is wired against.
#[derive(Debug, Clone)]
pub struct Infrastructure {
    /// Durable session storage.
    pub sessions: Arc<dyn SessionRepository>,
    /// User lookup and account mutations.
    pub users: Arc<dyn UserDirectory>,
    /// Cache for session projections and counters.
    pub cache: Arc<CacheManager>,
    /// Publisher for QR pairing events.
    pub pubsub: Arc<dyn PubSub>,
    /// Delivery of codes and account links.
    pub notifier: Arc<dyn Notifier>,
    /// IP reputation source for security validation.
    pub ip_reputation: Arc<dyn IpReputation>,
}

/// Construct every service from configuration and infrastructure.
pub fn build_state(config: AppConfig, infra: Infrastructure) -> AppResult<AppState> {
    let codecs = Arc::new(TokenCodecs::from_config(&config.auth)?);
    let hasher = Arc::new(PasswordHasher::new());

    let store = Arc::new(SessionStore::new(
        infra.sessions,
        Arc::clone(&infra.cache),
        Duration::from_secs(config.session.cache_ttl_seconds),
    ));
    let validator = Arc::new(SecurityValidator::new(
        infra.ip_reputation,
        config.security.clone(),
    ));

    let session_manager = Arc::new(SessionManager::new(
        Arc::clone(&codecs),
        store,
        validator,
        Arc::clone(&infra.users),
        Arc::clone(&hasher),
        config.session.clone(),
        config.security.clone(),
    ));

    let accounts = Arc::new(AccountService::new(
        AccountTokens::new(codecs.as_ref().clone()),
        Arc::clone(&infra.cache),
        Arc::clone(&infra.users),
        hasher,
        Arc::clone(&session_manager),
        Arc::clone(&infra.notifier),
        config.auth.password_min_length,
    ));

    let otp = Arc::new(OtpService::new(
        config.otp.clone(),
        Arc::clone(&infra.cache),
        infra.users,
        Arc::clone(&session_manager),
        infra.notifier,
    ));

    let qr_broker = Arc::new(QrLoginBroker::new(
        codecs.qr_login.clone(),
        Arc::clone(&session_manager),
        infra.pubsub,
    ));

    Ok(AppState {
        config: Arc::new(config),
        cache: infra.cache,
        session_manager,
        accounts,
        otp,
        qr_broker,
    })
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds.max(1));
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(axum_middleware::from_fn(request_logging))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use storyhub_auth::{LogNotifier, NoopIpReputation};
    use storyhub_cache::memory::MemoryCacheProvider;
    use storyhub_core::config::cache::MemoryCacheConfig;
    use storyhub_database::repositories::{MemorySessionRepository, MemoryUserDirectory};
    use storyhub_realtime::MemoryPubSub;

    fn test_app() -> Router {
        let cache = Arc::new(CacheManager::from_provider(
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default(), 300)),
            Duration::from_secs(300),
        ));
        let infra = Infrastructure {
            sessions: Arc::new(MemorySessionRepository::new()),
            users: Arc::new(MemoryUserDirectory::new()),
            cache,
            pubsub: Arc::new(MemoryPubSub::new(16)),
            notifier: Arc::new(LogNotifier),
            ip_reputation: Arc::new(NoopIpReputation),
        };
        build_app(build_state(AppConfig::default(), infra).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let response = test_app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sessions_require_bearer_token() {
        let response = test_app()
            .oneshot(
                Request::get("/api/auth/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_forged_bearer_token_rejected() {
        let response = test_app()
            .oneshot(
                Request::get("/api/auth/sessions")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_body_is_validated() {
        let response = test_app()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"not-an-email","password":"x","fingerprint":"fp"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
