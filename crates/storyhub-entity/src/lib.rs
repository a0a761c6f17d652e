//! # storyhub-entity
//!
//! Entity models for the StoryHub session subsystem. Database entities
//! derive `sqlx::FromRow`; everything derives `Serialize`/`Deserialize`
//! so it can be projected into the cache as JSON.

pub mod session;
pub mod user;
