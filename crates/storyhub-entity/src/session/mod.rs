//! Session domain entities.

pub mod device;
pub mod level;
pub mod model;
pub mod token;

pub use device::DeviceInfo;
pub use level::SecurityLevel;
pub use model::{NewSession, Session};
pub use token::TokenPair;
