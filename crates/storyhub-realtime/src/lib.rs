//! # storyhub-realtime
//!
//! Real-time plumbing for StoryHub:
//!
//! - Publish/subscribe backends (in-memory for a single node, Redis for
//!   several)
//! - The QR pairing login broker and the events it publishes

pub mod bridge;
pub mod qr;

pub use bridge::{MemoryPubSub, connect};
pub use qr::{QrLoginBroker, QrLoginEvent, QrTicket};
