//! Signed token classes, opaque refresh tokens, and account tokens.

pub mod account;
pub mod claims;
pub mod codec;
pub mod refresh;

pub use account::{AccountGrant, AccountTokens};
pub use claims::{TokenClaims, TokenType};
pub use codec::{TokenCodec, TokenCodecs, TokenError};
