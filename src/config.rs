//! Server configuration module
//! Handles configuration parameters for the token service

use crate::constants::{
    DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REFRESH_TTL_DAYS,
    MAX_ACCESS_TTL_MINUTES, MAX_REFRESH_TTL_DAYS,
};
use crate::error::{BearerGuardError, Result};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Secret for signing/validating access tokens
    pub access_secret: String,
    /// Secret for signing/validating refresh tokens (must differ from the access secret)
    pub refresh_secret: String,
    /// Lifetime of access tokens
    pub access_ttl: Duration,
    /// Lifetime of refresh tokens
    pub refresh_ttl: Duration,
    /// Seed the admin/john/guest demo accounts at startup
    pub seed_demo_users: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

impl ServerConfig {
    /// Create a test configuration - DANGEROUS: Only for testing!
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            access_secret: "test-access-key-only-for-unit-tests-never-in-production".to_string(),
            refresh_secret: "test-refresh-key-only-for-unit-tests-never-in-production".to_string(),
            access_ttl: Duration::from_secs(DEFAULT_ACCESS_TTL_MINUTES as u64 * 60),
            refresh_ttl: Duration::from_secs(DEFAULT_REFRESH_TTL_DAYS as u64 * 86400),
            seed_demo_users: true,
        }
    }

    /// Validate that a secret meets security requirements
    fn validate_secret(secret: &str, secret_type: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(BearerGuardError::ConfigError(format!(
                "{} secret must be at least 32 characters long",
                secret_type
            )));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "change-in-production",
            "test-secret",
            "default",
            "secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(BearerGuardError::ConfigError(format!(
                    "{} secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    secret_type, pattern
                )));
            }
        }

        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(BearerGuardError::ConfigError(format!(
                "{} secret should contain mixed characters (letters, numbers, symbols)",
                secret_type
            )));
        }

        Ok(())
    }

    /// Access and refresh tokens must be signed in different contexts
    fn validate_secrets_are_different(access_secret: &str, refresh_secret: &str) -> Result<()> {
        if access_secret == refresh_secret {
            return Err(BearerGuardError::ConfigError(
                "Access and refresh secrets must be different. A shared secret lets one token kind be replayed as the other.".to_string()
            ));
        }
        Ok(())
    }

    /// Token lifetime in `1..=max` units of `unit_secs` seconds
    fn lifetime(name: &str, value: u64, max: u64, unit_secs: u64) -> Result<Duration> {
        if value == 0 || value > max {
            return Err(BearerGuardError::ConfigError(format!(
                "{} must be between 1 and {}, got {}",
                name, max, value
            )));
        }
        value
            .checked_mul(unit_secs)
            .map(Duration::from_secs)
            .ok_or_else(|| BearerGuardError::ConfigError(format!("{} is too large", name)))
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("BEARER_GUARD_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = lookup("BEARER_GUARD_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let access_ttl_minutes: u64 = lookup("BEARER_GUARD_ACCESS_TTL_MINUTES")
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_ACCESS_TTL_MINUTES as u64);

        let refresh_ttl_days: u64 = lookup("BEARER_GUARD_REFRESH_TTL_DAYS")
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_TTL_DAYS as u64);

        let access_ttl = Self::lifetime(
            "BEARER_GUARD_ACCESS_TTL_MINUTES",
            access_ttl_minutes,
            MAX_ACCESS_TTL_MINUTES,
            60,
        )?;
        let refresh_ttl = Self::lifetime(
            "BEARER_GUARD_REFRESH_TTL_DAYS",
            refresh_ttl_days,
            MAX_REFRESH_TTL_DAYS,
            86400,
        )?;

        let access_secret = lookup("BEARER_GUARD_ACCESS_SECRET")
            .or_else(|| lookup("JWT_SECRET"))
            .ok_or_else(|| {
                BearerGuardError::ConfigError(
                    "BEARER_GUARD_ACCESS_SECRET (or JWT_SECRET) environment variable is required. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;

        let refresh_secret = lookup("BEARER_GUARD_REFRESH_SECRET")
            .or_else(|| lookup("JWT_REFRESH_SECRET"))
            .ok_or_else(|| {
                BearerGuardError::ConfigError(
                    "BEARER_GUARD_REFRESH_SECRET (or JWT_REFRESH_SECRET) environment variable is required. \
                     Generate one with: openssl rand -base64 32 \
                     NOTE: it must be different from the access secret."
                        .to_string(),
                )
            })?;

        let seed_demo_users = lookup("BEARER_GUARD_SEED_DEMO_USERS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true);

        Self::validate_secret(&access_secret, "Access")?;
        Self::validate_secret(&refresh_secret, "Refresh")?;
        Self::validate_secrets_are_different(&access_secret, &refresh_secret)?;

        Ok(Self {
            host,
            port,
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            seed_demo_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    #[should_panic(expected = "ServerConfig::default() is not allowed for security reasons")]
    fn test_default_panics() {
        let _ = ServerConfig::default();
    }

    #[test]
    fn test_for_testing_uses_distinct_secrets() {
        let config = ServerConfig::for_testing();
        assert_ne!(config.access_secret, config.refresh_secret);
        assert!(config.seed_demo_users);
    }

    #[test]
    fn test_requires_access_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ACCESS_SECRET"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BEARER_GUARD_ACCESS_SECRET", "k3y_for_access_tokens_32_chars_long_a1"),
            ("BEARER_GUARD_REFRESH_SECRET", "k3y_for_refresh_tokens_32_chars_long_b2"),
        ]))
        .unwrap();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.access_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.refresh_ttl, Duration::from_secs(7 * 86400));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("BEARER_GUARD_ACCESS_SECRET", "k3y_for_access_tokens_32_chars_long_a1"),
            ("BEARER_GUARD_REFRESH_SECRET", "k3y_for_refresh_tokens_32_chars_long_b2"),
            ("BEARER_GUARD_ACCESS_TTL_MINUTES", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        for (name, value) in [
            ("BEARER_GUARD_REFRESH_TTL_DAYS", "1000000000000"),
            ("BEARER_GUARD_REFRESH_TTL_DAYS", "366"),
            ("BEARER_GUARD_ACCESS_TTL_MINUTES", "18446744073709551615"),
            ("BEARER_GUARD_ACCESS_TTL_MINUTES", "1441"),
        ] {
            let err = ServerConfig::from_lookup(lookup_from(&[
                ("BEARER_GUARD_ACCESS_SECRET", "k3y_for_access_tokens_32_chars_long_a1"),
                ("BEARER_GUARD_REFRESH_SECRET", "k3y_for_refresh_tokens_32_chars_long_b2"),
                (name, value),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains(name), "{}={} must be rejected", name, value);
        }
    }

    #[test]
    fn test_largest_ttl_accepted() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BEARER_GUARD_ACCESS_SECRET", "k3y_for_access_tokens_32_chars_long_a1"),
            ("BEARER_GUARD_REFRESH_SECRET", "k3y_for_refresh_tokens_32_chars_long_b2"),
            ("BEARER_GUARD_REFRESH_TTL_DAYS", "365"),
        ]))
        .unwrap();
        assert_eq!(config.refresh_ttl, Duration::from_secs(365 * 86400));
    }
}
