//! Token administration endpoints
//!
//! Admins can revoke any token they hold a copy of and read revocation and
//! security event statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use warp::{Rejection, Reply};

use crate::auth::token::TokenKind;
use crate::error::{BearerGuardError, Result};
use crate::handlers::auth::{authorize_admin, CurrentUser};
use crate::security::with_api_security_headers;
use crate::security_logger::SecurityEvent;
use crate::state::{AppState, SharedState};
use crate::storage::token_revocation::{RevocationReason, RevocationStats};

/// Body of `POST /admin/revoke`
#[derive(Debug, Deserialize)]
pub struct RevokeTokenRequest {
    /// Access or refresh token to revoke
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeTokenResponse {
    pub token_id: String,
    pub subject: String,
    pub token_type: TokenKind,
    /// False when the token was already revoked before this request
    pub newly_revoked: bool,
    pub revoked_at: DateTime<Utc>,
    pub reason: RevocationReason,
}

#[derive(Debug, Serialize)]
pub struct RevocationStatsResponse {
    pub revocations: RevocationStats,
    pub security_events: HashMap<String, usize>,
    pub generated_at: DateTime<Utc>,
}

/// Revoke a token on behalf of an admin and report the stored record
pub async fn revoke_token(token: &str, state: &AppState) -> Result<RevokeTokenResponse> {
    let claims = state.tokens.decode_any(token).map_err(|e| match e.auth_failure() {
        Some(failure) => {
            BearerGuardError::ValidationError(format!("Token cannot be revoked: {}", failure))
        }
        None => e,
    })?;

    let newly_revoked = state
        .tokens
        .revoke(&claims, RevocationReason::AdminRevocation)
        .await?;

    if newly_revoked {
        state
            .security_log
            .log_event(SecurityEvent::TokenRevoked {
                username: claims.sub.clone(),
                token_id: claims.jti.clone(),
                kind: claims.token_type,
            })
            .await;
    }

    let record = state
        .tokens
        .revocations()
        .get(&claims.jti)
        .await?
        .ok_or_else(|| {
            BearerGuardError::StorageError(format!("Revocation of {} was not recorded", claims.jti))
        })?;

    Ok(RevokeTokenResponse {
        token_id: record.token_id,
        subject: record.subject,
        token_type: record.token_type,
        newly_revoked,
        revoked_at: record.revoked_at,
        reason: record.reason,
    })
}

/// `POST /admin/revoke` with `{ "token": ... }`
pub async fn revoke(
    current: CurrentUser,
    request: RevokeTokenRequest,
    state: SharedState,
) -> std::result::Result<impl Reply, Rejection> {
    authorize_admin(&current, "/admin/revoke", &state)
        .await
        .map_err(warp::reject::custom)?;

    let response = revoke_token(&request.token, &state)
        .await
        .map_err(warp::reject::custom)?;

    log::info!(
        "Admin {} revoked {} token {} of {}",
        current.user.username,
        response.token_type,
        response.token_id,
        response.subject
    );
    Ok(with_api_security_headers(warp::reply::json(&response)))
}

/// `GET /admin/revocations`
pub async fn revocation_stats(
    current: CurrentUser,
    state: SharedState,
) -> std::result::Result<impl Reply, Rejection> {
    authorize_admin(&current, "/admin/revocations", &state)
        .await
        .map_err(warp::reject::custom)?;

    let revocations = state
        .tokens
        .revocations()
        .stats()
        .await
        .map_err(warp::reject::custom)?;

    let response = RevocationStatsResponse {
        revocations,
        security_events: state.security_log.get_event_stats().await,
        generated_at: Utc::now(),
    };
    Ok(with_api_security_headers(warp::reply::json(&response)))
}
