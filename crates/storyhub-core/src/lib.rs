//! # storyhub-core
//!
//! Core crate for StoryHub. Contains configuration schemas, the unified
//! error system, and the collaborator traits (cache, publish/subscribe,
//! IP reputation) that the session subsystem is wired against.
//!
//! This crate has **no** internal dependencies on other StoryHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
