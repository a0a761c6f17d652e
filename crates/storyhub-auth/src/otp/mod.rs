//! One-time passcodes: the codec, delivery seam, and confirmation flows.

pub mod codec;
pub mod notifier;
pub mod service;

pub use codec::OtpCodec;
pub use notifier::{LogNotifier, Notifier};
pub use service::{OtpConfirmation, OtpOutcome, OtpPurpose, OtpService};
