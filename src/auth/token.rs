use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::auth::user::UserRole;
use crate::config::ServerConfig;
use crate::constants::{
    BEARER_PREFIX, DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS, MAX_TOKEN_LENGTH,
};
use crate::error::{AuthFailure, BearerGuardError, Result};
use crate::storage::token_revocation::{RevocationReason, RevokedToken, SharedRevocationStore};

/// Token type marker carried in every claim set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    pub role: UserRole,
    /// Access or refresh
    pub token_type: TokenKind,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Not before (as UTC timestamp)
    pub nbf: i64,
    /// Unique token id, the key of the revocation set
    pub jti: String,
}

impl Claims {
    /// Creates claims expiring `ttl` from now
    pub fn new(username: &str, role: UserRole, token_type: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();

        Self {
            sub: username.to_string(),
            role,
            token_type,
            exp: now + ttl.num_seconds(),
            iat: now,
            nbf: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Check if the token is expired. A token is still valid during the
    /// second named by `exp`, as in the verifier.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Tokens returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies access/refresh tokens.
///
/// Access and refresh tokens are signed with separate secrets and carry a
/// `token_type` marker, so neither kind verifies where the other is expected.
pub struct TokenManager {
    access_keys: SigningKeys,
    refresh_keys: SigningKeys,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    revocations: SharedRevocationStore,
}

impl TokenManager {
    /// Creates a token manager with default lifetimes
    pub fn new(access_secret: &str, refresh_secret: &str, revocations: SharedRevocationStore) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access_keys: SigningKeys::from_secret(access_secret),
            refresh_keys: SigningKeys::from_secret(refresh_secret),
            validation,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
            revocations,
        }
    }

    pub fn from_config(config: &ServerConfig, revocations: SharedRevocationStore) -> Result<Self> {
        let access_ttl = Duration::from_std(config.access_ttl).map_err(|_| {
            BearerGuardError::ConfigError("Access token lifetime out of range".to_string())
        })?;
        let refresh_ttl = Duration::from_std(config.refresh_ttl).map_err(|_| {
            BearerGuardError::ConfigError("Refresh token lifetime out of range".to_string())
        })?;

        Ok(Self::new(&config.access_secret, &config.refresh_secret, revocations)
            .with_lifetimes(access_ttl, refresh_ttl))
    }

    pub fn with_lifetimes(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn revocations(&self) -> &SharedRevocationStore {
        &self.revocations
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access_keys,
            TokenKind::Refresh => &self.refresh_keys,
        }
    }

    /// Signs the claims with the key matching their token type
    pub fn encode_claims(&self, claims: &Claims) -> Result<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.token_type).encoding,
        )
        .map_err(|e| BearerGuardError::TokenEncoding(format!("Failed to generate token: {}", e)))
    }

    /// Mints a fresh access token
    pub fn issue_access(&self, username: &str, role: UserRole) -> Result<String> {
        let claims = Claims::new(username, role, TokenKind::Access, self.access_ttl);
        self.encode_claims(&claims)
    }

    /// Mints an access token and a refresh token for one login
    pub fn issue_pair(&self, username: &str, role: UserRole) -> Result<TokenPair> {
        let access_token = self.issue_access(username, role)?;
        let refresh_claims = Claims::new(username, role, TokenKind::Refresh, self.refresh_ttl);
        let refresh_token = self.encode_claims(&refresh_claims)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Checks shape, signature, expiry and type marker. Does not consult
    /// the revocation set.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
            return Err(AuthFailure::Malformed.into());
        }
        if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(AuthFailure::Malformed.into());
        }

        let data = decode::<Claims>(token, &self.keys(expected).decoding, &self.validation)
            .map_err(|e| {
                log::debug!("{} token rejected: {}", expected, e);
                let failure = match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        AuthFailure::BadSignature
                    }
                    ErrorKind::ExpiredSignature => AuthFailure::Expired,
                    _ => AuthFailure::Malformed,
                };
                BearerGuardError::Authentication(failure)
            })?;

        let claims = data.claims;
        if claims.token_type != expected {
            return Err(AuthFailure::WrongType.into());
        }
        if claims.sub.is_empty() || claims.jti.is_empty() {
            return Err(AuthFailure::Malformed.into());
        }

        Ok(claims)
    }

    /// Decodes a token of either kind, trying the access key first
    pub fn decode_any(&self, token: &str) -> Result<Claims> {
        match self.decode(token, TokenKind::Access) {
            Err(BearerGuardError::Authentication(
                AuthFailure::BadSignature | AuthFailure::WrongType,
            )) => self.decode(token, TokenKind::Refresh),
            other => other,
        }
    }

    /// Full verification: `decode` plus the revocation check
    pub async fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = self.decode(token, expected)?;

        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AuthFailure::Revoked.into());
        }

        Ok(claims)
    }

    /// Exchanges a refresh token for a new access token. The refresh token
    /// itself is returned unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.verify(refresh_token, TokenKind::Refresh).await?;
        let access_token = self.issue_access(&claims.sub, claims.role)?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh_token.to_string(),
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Adds the token's id to the revocation set. Returns false if it was
    /// already revoked.
    pub async fn revoke(&self, claims: &Claims, reason: RevocationReason) -> Result<bool> {
        self.revocations
            .revoke(RevokedToken {
                token_id: claims.jti.clone(),
                subject: claims.sub.clone(),
                token_type: claims.token_type,
                revoked_at: Utc::now(),
                expires_at: claims.expires_at(),
                reason,
            })
            .await
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let token = auth_header
        .strip_prefix(BEARER_PREFIX)
        .or_else(|| auth_header.strip_prefix("bearer "))?
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
