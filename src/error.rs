use std::error::Error;
use std::fmt;

/// Reasons a caller could not be authenticated (HTTP 401)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No bearer token in the request
    MissingToken,
    /// Unknown username, wrong password or disabled account
    InvalidCredentials,
    /// Token is not a well-formed JWT
    Malformed,
    /// Signature does not match the expected key
    BadSignature,
    /// Token is past its expiry timestamp
    Expired,
    /// Access token used as refresh token or the other way around
    WrongType,
    /// Token id is in the revocation set
    Revoked,
    /// Token subject no longer exists in the credential store
    UnknownUser,
}

impl AuthFailure {
    /// Stable machine-readable code used in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Malformed => "malformed_token",
            Self::BadSignature => "bad_signature",
            Self::Expired => "token_expired",
            Self::WrongType => "wrong_token_type",
            Self::Revoked => "token_revoked",
            Self::UnknownUser => "unknown_user",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing bearer token"),
            Self::InvalidCredentials => write!(f, "Incorrect username or password"),
            Self::Malformed => write!(f, "Malformed token"),
            Self::BadSignature => write!(f, "Invalid token signature"),
            Self::Expired => write!(f, "Token has expired"),
            Self::WrongType => write!(f, "Invalid token type"),
            Self::Revoked => write!(f, "Token has been revoked"),
            Self::UnknownUser => write!(f, "User not found"),
        }
    }
}

#[derive(Debug)]
pub enum BearerGuardError {
    // Auth errors
    Authentication(AuthFailure),
    AccessDenied(String),

    // Validation errors
    ValidationError(String),
    /// Request body larger than the given byte limit
    PayloadTooLarge(u64),

    // Crypto errors
    PasswordHash(String),
    TokenEncoding(String),

    // Storage errors
    StorageError(String),

    // Configuration errors
    ConfigError(String),

    // Internal errors
    Internal(String),
}

impl BearerGuardError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication(_) => 401,
            Self::AccessDenied(_) => 403,
            Self::ValidationError(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            _ => 500,
        }
    }

    /// Machine-readable code used in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication(failure) => failure.code(),
            Self::AccessDenied(_) => "access_denied",
            Self::ValidationError(_) => "validation_error",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::PasswordHash(_) => "password_hash_error",
            Self::TokenEncoding(_) => "token_encoding_error",
            Self::StorageError(_) => "storage_error",
            Self::ConfigError(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// The authentication failure, if this is one
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            Self::Authentication(failure) => Some(*failure),
            _ => None,
        }
    }
}

impl fmt::Display for BearerGuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(failure) => write!(f, "Authentication failed: {}", failure),
            Self::AccessDenied(msg) => write!(f, "Forbidden: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::PayloadTooLarge(limit) => {
                write!(f, "Request body exceeds {} bytes", limit)
            }
            Self::PasswordHash(msg) => write!(f, "Password hash error: {}", msg),
            Self::TokenEncoding(msg) => write!(f, "Token encoding error: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl Error for BearerGuardError {}

impl From<AuthFailure> for BearerGuardError {
    fn from(failure: AuthFailure) -> Self {
        BearerGuardError::Authentication(failure)
    }
}

impl warp::reject::Reject for BearerGuardError {}

// Generic result type for bearer-guard
pub type Result<T> = std::result::Result<T, BearerGuardError>;
