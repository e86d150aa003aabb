//! Token revocation storage
//!
//! Holds the ids (`jti`) of tokens invalidated before their natural expiry.
//! The token verifier consults it on every request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::token::TokenKind;
use crate::error::Result;

/// Information about a revoked token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    /// JWT ID (jti)
    pub token_id: String,
    /// Username who owned the token
    pub subject: String,
    pub token_type: TokenKind,
    pub revoked_at: DateTime<Utc>,
    /// When the original token expires
    pub expires_at: DateTime<Utc>,
    pub reason: RevocationReason,
}

/// Reason for token revocation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    /// User initiated logout
    UserLogout,
    /// Administrative action
    AdminRevocation,
}

/// Token revocation storage trait
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Add a token to the revocation set. Returns false if it was already there.
    async fn revoke(&self, revoked_token: RevokedToken) -> Result<bool>;

    /// Check if a token id is revoked
    async fn is_revoked(&self, token_id: &str) -> Result<bool>;

    /// Get revocation information for a token id
    async fn get(&self, token_id: &str) -> Result<Option<RevokedToken>>;

    /// Number of revoked ids held
    async fn len(&self) -> Result<usize>;

    /// Get revocation statistics
    async fn stats(&self) -> Result<RevocationStats>;
}

/// Statistics about token revocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationStats {
    pub total_revoked: usize,
    pub by_reason: HashMap<RevocationReason, usize>,
    /// Revocations whose token has not expired yet
    pub active_revocations: usize,
}

/// In-memory revocation set. Entries are never removed.
pub struct MemoryRevocationStore {
    revoked_tokens: RwLock<HashMap<String, RevokedToken>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self {
            revoked_tokens: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, revoked_token: RevokedToken) -> Result<bool> {
        let mut revoked_tokens = self.revoked_tokens.write().await;

        if revoked_tokens.contains_key(&revoked_token.token_id) {
            log::debug!("Token already revoked: {}", revoked_token.token_id);
            return Ok(false);
        }

        log::info!(
            "Token revoked: {} ({:?}, subject {})",
            revoked_token.token_id,
            revoked_token.reason,
            revoked_token.subject
        );
        revoked_tokens.insert(revoked_token.token_id.clone(), revoked_token);
        Ok(true)
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool> {
        let revoked_tokens = self.revoked_tokens.read().await;
        Ok(revoked_tokens.contains_key(token_id))
    }

    async fn get(&self, token_id: &str) -> Result<Option<RevokedToken>> {
        let revoked_tokens = self.revoked_tokens.read().await;
        Ok(revoked_tokens.get(token_id).cloned())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.revoked_tokens.read().await.len())
    }

    async fn stats(&self) -> Result<RevocationStats> {
        let revoked_tokens = self.revoked_tokens.read().await;
        let now = Utc::now();

        let mut by_reason = HashMap::new();
        let mut active_revocations = 0;

        for revoked_token in revoked_tokens.values() {
            *by_reason.entry(revoked_token.reason).or_insert(0) += 1;
            if revoked_token.expires_at > now {
                active_revocations += 1;
            }
        }

        Ok(RevocationStats {
            total_revoked: revoked_tokens.len(),
            by_reason,
            active_revocations,
        })
    }
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared reference to a revocation store
pub type SharedRevocationStore = Arc<dyn RevocationStore>;

/// Create a new memory-based revocation store
pub fn create_memory_revocation_store() -> SharedRevocationStore {
    Arc::new(MemoryRevocationStore::new())
}
