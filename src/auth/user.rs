use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-wide user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored account, including the password hash
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique key
    pub username: String,
    pub email: String,
    pub role: UserRole,
    /// Argon2 PHC string
    pub password_hash: String,
    pub disabled: bool,
}

impl UserRecord {
    pub fn new(username: &str, email: &str, role: UserRole, password_hash: String) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            role,
            password_hash,
            disabled: false,
        }
    }

    /// Public view without the password hash
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            disabled: self.disabled,
        }
    }
}

/// Account data safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub disabled: bool,
}
