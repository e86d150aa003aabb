//! Credential storage
//!
//! Maps usernames to their stored record. The service talks to the
//! `CredentialStore` trait so a persistent backend can replace the
//! in-memory one.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::user::{UserRecord, UserRole};
use crate::error::{AuthFailure, BearerGuardError, Result};

/// Credential storage trait
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by username
    async fn get(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Insert or replace a user record
    async fn put(&self, record: UserRecord) -> Result<()>;

    /// Check whether a username exists
    async fn contains(&self, username: &str) -> Result<bool>;

    /// All records, sorted by username
    async fn list(&self) -> Result<Vec<UserRecord>>;
}

/// In-memory credential store
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn put(&self, record: UserRecord) -> Result<()> {
        if record.username.is_empty() {
            return Err(BearerGuardError::StorageError(
                "Username must not be empty".to_string(),
            ));
        }
        self.users.write().await.insert(record.username.clone(), record);
        Ok(())
    }

    async fn contains(&self, username: &str) -> Result<bool> {
        Ok(self.users.read().await.contains_key(username))
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        let mut records: Vec<UserRecord> = self.users.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(records)
    }
}

/// Shared reference to a credential store
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

/// Create an empty memory-based credential store
pub fn create_memory_credential_store() -> SharedCredentialStore {
    Arc::new(MemoryCredentialStore::new())
}

/// Populate the store with the admin/john/guest demo accounts
pub async fn seed_demo_users(store: &dyn CredentialStore, password: &str) -> Result<()> {
    let accounts = [
        ("admin", UserRole::Admin),
        ("john", UserRole::User),
        ("guest", UserRole::Guest),
    ];

    for (username, role) in accounts {
        let email = format!("{}@example.com", username);
        let record = UserRecord::new(username, &email, role, hash_password(password)?);
        store.put(record).await?;
    }

    log::info!("Seeded {} demo accounts", accounts.len());
    Ok(())
}

/// Check a username/password pair against the store.
///
/// Unknown users, wrong passwords and disabled accounts all yield the
/// same `InvalidCredentials` failure.
pub async fn authenticate(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<UserRecord> {
    let record = match store.get(username).await? {
        Some(record) => record,
        None => return Err(AuthFailure::InvalidCredentials.into()),
    };

    if !verify_password(password, &record.password_hash)? {
        return Err(AuthFailure::InvalidCredentials.into());
    }

    if record.disabled {
        log::warn!("Login attempt for disabled account: {}", username);
        return Err(AuthFailure::InvalidCredentials.into());
    }

    Ok(record)
}
