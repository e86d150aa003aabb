//! Role-based access guard
//!
//! Runs after token verification. Authentication failures (401) are the
//! verifier's business; this module only produces `AccessDenied` (403).

use crate::auth::token::Claims;
use crate::auth::user::UserRole;
use crate::error::{BearerGuardError, Result};

/// Role predicate applied to a verified claim set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGuard {
    required: UserRole,
}

impl AccessGuard {
    pub fn new(required: UserRole) -> Self {
        Self { required }
    }

    pub fn admin() -> Self {
        Self::new(UserRole::Admin)
    }

    pub fn required_role(&self) -> UserRole {
        self.required
    }

    /// Returns the authorized subject, or `AccessDenied`
    pub fn authorize<'a>(&self, claims: &'a Claims) -> Result<&'a str> {
        if self.required.is_admin() {
            require_admin(claims)
        } else {
            require_role(claims, self.required)
        }
    }
}

/// Checks that the claim set carries exactly `required`
pub fn require_role(claims: &Claims, required: UserRole) -> Result<&str> {
    if claims.role != required {
        return Err(BearerGuardError::AccessDenied(format!(
            "{} access required",
            capitalize(required.as_str())
        )));
    }
    Ok(&claims.sub)
}

pub fn require_admin(claims: &Claims) -> Result<&str> {
    if !claims.role.is_admin() {
        return Err(BearerGuardError::AccessDenied(
            "Admin access required".to_string(),
        ));
    }
    Ok(&claims.sub)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
