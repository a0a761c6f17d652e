//! Session lifecycle: storage, login/logout/refresh, account flows, and
//! retention cleanup.

pub mod account;
pub mod cleanup;
pub mod manager;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use account::AccountService;
pub use cleanup::SessionCleanup;
pub use manager::{ClientContext, LoginResult, LogoutOutcome, SessionManager};
pub use store::{Removal, SessionStore};
