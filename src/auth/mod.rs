//! Authentication and authorization module

pub mod guard;
pub mod password;
pub mod token;
pub mod user;

// Re-export main components
pub use guard::{require_admin, require_role, AccessGuard};
pub use token::{Claims, TokenKind, TokenManager, TokenPair};
pub use user::{UserProfile, UserRecord, UserRole};
