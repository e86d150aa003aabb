//! Security-focused logging module to track authentication events

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::token::TokenKind;
use crate::error::AuthFailure;

/// Types of security events to track
#[derive(Debug, Clone)]
pub enum SecurityEvent {
    LoginSucceeded { username: String },
    LoginFailed { username: String },
    TokenRejected { kind: TokenKind, failure: AuthFailure, route: String },
    TokenRevoked { username: String, token_id: String, kind: TokenKind },
    AccessDenied { username: String, route: String },
}

impl SecurityEvent {
    fn key(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSucceeded { .. } => "login_succeeded",
            SecurityEvent::LoginFailed { .. } => "login_failed",
            SecurityEvent::TokenRejected { .. } => "token_rejected",
            SecurityEvent::TokenRevoked { .. } => "token_revoked",
            SecurityEvent::AccessDenied { .. } => "access_denied",
        }
    }
}

/// Logs security events and counts them per kind, raising an alert line
/// each time a kind crosses its threshold.
pub struct SecurityLogger {
    event_counts: RwLock<HashMap<&'static str, usize>>,
    alert_thresholds: HashMap<&'static str, usize>,
}

impl SecurityLogger {
    pub fn new() -> Self {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert("login_failed", 5);
        alert_thresholds.insert("token_rejected", 10);
        alert_thresholds.insert("access_denied", 20);

        Self {
            event_counts: RwLock::new(HashMap::new()),
            alert_thresholds,
        }
    }

    /// Log a security event
    pub async fn log_event(&self, event: SecurityEvent) {
        let key = event.key();

        {
            let mut counts = self.event_counts.write().await;
            let count = counts.entry(key).or_insert(0);
            *count += 1;

            if let Some(&threshold) = self.alert_thresholds.get(key) {
                if *count % threshold == 0 {
                    log::error!("SECURITY ALERT: {} events of type '{}' detected", count, key);
                }
            }
        }

        match event {
            SecurityEvent::LoginSucceeded { username } => {
                log::info!("SECURITY: Login succeeded - User: {}", username);
            }
            SecurityEvent::LoginFailed { username } => {
                log::warn!("SECURITY: Login failed - User: {}", username);
            }
            SecurityEvent::TokenRejected { kind, failure, route } => {
                log::warn!(
                    "SECURITY: {} token rejected - Route: {}, Reason: {}",
                    kind,
                    route,
                    failure
                );
            }
            SecurityEvent::TokenRevoked { username, token_id, kind } => {
                log::info!(
                    "SECURITY: {} token revoked - User: {}, Token: {}",
                    kind,
                    username,
                    token_id
                );
            }
            SecurityEvent::AccessDenied { username, route } => {
                log::warn!("SECURITY: Access denied - User: {}, Route: {}", username, route);
            }
        }
    }

    /// Number of events logged per kind
    pub async fn get_event_stats(&self) -> HashMap<String, usize> {
        let counts = self.event_counts.read().await;
        counts.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSecurityLogger = Arc<SecurityLogger>;
