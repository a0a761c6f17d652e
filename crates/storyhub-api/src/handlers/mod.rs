//! HTTP handlers. Each one translates a request into a single service call.

pub mod account;
pub mod auth;
pub mod health;
pub mod otp;
pub mod qr;
