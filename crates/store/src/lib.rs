//! Local persistence for account-rust
//!
//! This crate provides the user cache and the active-session store used by
//! the session repository, with in-memory and JSON-file implementations.

mod error;
mod file;
mod session;
mod user;

pub use error::StoreError;
pub use file::{FileSessionStore, FileUserStore, SESSION_FILE, USERS_FILE};
pub use session::{Credentials, MemorySessionStore, SessionStore};
pub use user::{MemoryUserStore, UserStore};
