//! Remote account client for Rust
//!
//! This crate provides the account data model and the remote side of the
//! session flow: registration, login, and profile fetch/update against an
//! account service.

mod client;
mod error;
mod fetch;
mod models;

pub use client::{AuthClient, RemoteClient};
pub use error::AuthError;
pub use models::{AuthResponse, Avatar, LoginRequest, RegisterRequest, User};
