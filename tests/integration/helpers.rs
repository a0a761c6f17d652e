//! Shared test helpers for integration tests.
//!
//! Every test builds its own application backed by the in-memory session
//! repository, moka cache, and memory pub/sub.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storyhub_api::{Infrastructure, build_app, build_state};
use storyhub_auth::{NoopIpReputation, Notifier, OtpPurpose, PasswordHasher, TokenType};
use storyhub_cache::CacheManager;
use storyhub_cache::memory::MemoryCacheProvider;
use storyhub_core::config::AppConfig;
use storyhub_core::config::cache::MemoryCacheConfig;
use storyhub_core::result::AppResult;
use storyhub_database::repositories::{MemorySessionRepository, MemoryUserDirectory};
use storyhub_entity::user::{User, UserRole, UserStatus};
use storyhub_realtime::MemoryPubSub;

/// Notifier that keeps every delivery for inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    otps: Mutex<Vec<(String, OtpPurpose, String)>>,
    account_tokens: Mutex<Vec<(String, TokenType, String)>>,
}

impl RecordingNotifier {
    /// Most recent code sent to `subject`.
    pub fn last_otp(&self, subject: &str) -> Option<String> {
        self.otps
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _, _)| s == subject)
            .map(|(_, _, code)| code.clone())
    }

    /// Number of codes sent so far.
    pub fn otp_count(&self) -> usize {
        self.otps.lock().unwrap().len()
    }

    /// Most recent account token of `token_type` sent to `email`.
    pub fn last_account_token(&self, email: &str, token_type: TokenType) -> Option<String> {
        self.account_tokens
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, t, _)| e == email && *t == token_type)
            .map(|(_, _, token)| token.clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(&self, subject: &str, purpose: OtpPurpose, code: &str) -> AppResult<()> {
        self.otps
            .lock()
            .unwrap()
            .push((subject.to_string(), purpose, code.to_string()));
        Ok(())
    }

    async fn send_account_token(
        &self,
        email: &str,
        token_type: TokenType,
        token: &str,
    ) -> AppResult<()> {
        self.account_tokens
            .lock()
            .unwrap()
            .push((email.to_string(), token_type, token.to_string()));
        Ok(())
    }
}

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Parsed JSON body, `Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// The `data` field of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// User directory backing the app
    pub users: Arc<MemoryUserDirectory>,
    /// Pub/sub the QR broker publishes on
    pub pubsub: Arc<MemoryPubSub>,
    /// Captured code and token deliveries
    pub notifier: Arc<RecordingNotifier>,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a test application with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with `config`.
    pub fn with_config(config: AppConfig) -> Self {
        let cache = Arc::new(CacheManager::from_provider(
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default(), 300)),
            Duration::from_secs(300),
        ));
        let users = Arc::new(MemoryUserDirectory::new());
        let pubsub = Arc::new(MemoryPubSub::new(16));
        let notifier = Arc::new(RecordingNotifier::default());

        let infra = Infrastructure {
            sessions: Arc::new(MemorySessionRepository::new()),
            users: users.clone(),
            cache,
            pubsub: pubsub.clone(),
            notifier: notifier.clone(),
            ip_reputation: Arc::new(NoopIpReputation),
        };
        let state = build_state(config.clone(), infra).expect("Failed to build state");

        Self {
            router: build_app(state),
            users,
            pubsub,
            notifier,
            config,
        }
    }

    /// Insert a user with `password` and `status`.
    pub async fn create_user(&self, email: &str, password: &str, status: UserStatus) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            mobile: None,
            password_hash: PasswordHasher::new()
                .hash(password)
                .await
                .expect("Failed to hash password"),
            display_name: None,
            role: UserRole::Reader,
            status,
            email_verified: status == UserStatus::Active,
            last_logout_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.clone());
        user
    }

    /// Send a request and capture status and JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let method: Method = method.parse().expect("Invalid method");
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Log in with a password and return the response `data`.
    pub async fn login(&self, email: &str, password: &str, fingerprint: &str) -> Value {
        let response = self
            .request(
                "POST",
                "/api/auth/login",
                Some(serde_json::json!({
                    "email": email,
                    "password": password,
                    "fingerprint": fingerprint,
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.data().clone()
    }
}

/// String field of a JSON object.
pub fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field '{key}' in {value}"))
}
