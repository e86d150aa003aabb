//! Shared application state injected into every request handler

use std::sync::Arc;
use std::time::Duration;

use crate::auth::token::TokenManager;
use crate::config::ServerConfig;
use crate::constants::DEMO_PASSWORD;
use crate::error::Result;
use crate::security_logger::{SecurityLogger, SharedSecurityLogger};
use crate::storage::token_revocation::create_memory_revocation_store;
use crate::storage::user_store::{create_memory_credential_store, seed_demo_users, SharedCredentialStore};

/// Simulated latencies used by the concurrency endpoints
#[derive(Debug, Clone, Copy)]
pub struct DemoTimings {
    /// Duration of `/sync` and `/async`
    pub endpoint_delay: Duration,
    /// Duration of each simulated fetch behind `/profile/{id}`
    pub fetch_delay: Duration,
    /// Gap between records of `/non-stream/data` and `/stream/data`
    pub chunk_delay: Duration,
    /// Gap between lines of `/stream/json`
    pub line_delay: Duration,
    /// Gap between words of `/stream/ai-response`
    pub word_delay: Duration,
}

impl DemoTimings {
    /// Every delay set to `delay`
    pub fn uniform(delay: Duration) -> Self {
        Self {
            endpoint_delay: delay,
            fetch_delay: delay,
            chunk_delay: delay,
            line_delay: delay,
            word_delay: delay,
        }
    }
}

impl Default for DemoTimings {
    fn default() -> Self {
        Self {
            endpoint_delay: Duration::from_secs(2),
            fetch_delay: Duration::from_secs(1),
            chunk_delay: Duration::from_secs(1),
            line_delay: Duration::from_millis(500),
            word_delay: Duration::from_millis(100),
        }
    }
}

pub struct AppState {
    pub tokens: TokenManager,
    pub users: SharedCredentialStore,
    pub security_log: SharedSecurityLogger,
    pub demo: DemoTimings,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(tokens: TokenManager, users: SharedCredentialStore) -> Self {
        Self {
            tokens,
            users,
            security_log: Arc::new(SecurityLogger::new()),
            demo: DemoTimings::default(),
        }
    }

    pub fn with_demo_timings(mut self, demo: DemoTimings) -> Self {
        self.demo = demo;
        self
    }

    /// Build in-memory stores and the token manager from configuration
    pub async fn from_config(config: &ServerConfig) -> Result<SharedState> {
        let revocations = create_memory_revocation_store();
        let tokens = TokenManager::from_config(config, revocations)?;
        let users = create_memory_credential_store();

        if config.seed_demo_users {
            seed_demo_users(users.as_ref(), DEMO_PASSWORD).await?;
        } else {
            log::warn!("Demo accounts disabled; credential store starts empty");
        }

        Ok(Arc::new(Self::new(tokens, users)))
    }
}
