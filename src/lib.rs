//! Bearer Guard - JWT access/refresh token service
//!
//! This library provides password-checked login, short-lived access tokens,
//! long-lived refresh tokens, role-based route guards and logout through a
//! token revocation set, served over HTTP with warp.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod security;
pub mod security_logger;
pub mod state;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use error::{AuthFailure, BearerGuardError, Result};
