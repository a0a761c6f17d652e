//! # storyhub-api
//!
//! HTTP API layer for the StoryHub session subsystem built on Axum.
//!
//! Exposes login, refresh, logout, session listing, one-time passcodes, QR
//! pairing, and account token flows. Handlers stay thin: every decision is
//! made by the services in `storyhub-auth` and `storyhub-realtime`.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{Infrastructure, build_app, build_state};
pub use error::ApiError;
pub use state::AppState;
