//! # storyhub-database
//!
//! PostgreSQL connection management, the repository traits the session
//! subsystem is written against, and their PostgreSQL and in-memory
//! implementations.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{SessionRepository, UserDirectory};
