//! QR pairing login.

pub mod broker;
pub mod event;

pub use broker::{QrLoginBroker, QrTicket, channel_for};
pub use event::QrLoginEvent;
