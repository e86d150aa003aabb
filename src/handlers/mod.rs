//! Request handlers for the HTTP endpoints

pub mod admin;
pub mod auth;
pub mod concurrency;
pub mod streaming;

pub use auth::{resolve_current_user, CurrentUser};
