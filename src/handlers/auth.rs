//! Authentication handlers: login, refresh, logout and the protected routes

use serde::{Deserialize, Serialize};
use warp::{Rejection, Reply};

use crate::auth::guard::AccessGuard;
use crate::auth::token::{extract_bearer_token, Claims, TokenKind};
use crate::auth::user::{UserRecord, UserRole};
use crate::error::{AuthFailure, BearerGuardError, Result};
use crate::security::{with_api_security_headers, AuthTimer};
use crate::security_logger::SecurityEvent;
use crate::state::{AppState, SharedState};
use crate::storage::token_revocation::RevocationReason;
use crate::storage::user_store::authenticate;

/// Query string of `POST /login`
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub username: String,
    pub password: String,
}

/// Body of `POST /refresh`
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Optional body of `POST /logout`
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    /// Number of token ids newly added to the revocation set
    pub revoked: usize,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub role: UserRole,
}

/// A request whose access token verified and whose subject still exists
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
    pub user: UserRecord,
}

fn reject(err: BearerGuardError) -> Rejection {
    warp::reject::custom(err)
}

/// Resolve the caller from an `Authorization` header value.
///
/// With `check_revocation` off the token still has to carry a valid
/// signature, expiry and type; only the revocation lookup is skipped.
pub async fn resolve_current_user(
    auth_header: Option<&str>,
    route: &str,
    state: &AppState,
    check_revocation: bool,
) -> Result<CurrentUser> {
    let token = auth_header
        .and_then(extract_bearer_token)
        .ok_or(BearerGuardError::Authentication(AuthFailure::MissingToken))?;

    let result = if check_revocation {
        state.tokens.verify(token, TokenKind::Access).await
    } else {
        state.tokens.decode(token, TokenKind::Access)
    };

    let claims = match result {
        Ok(claims) => claims,
        Err(e) => {
            if let Some(failure) = e.auth_failure() {
                state
                    .security_log
                    .log_event(SecurityEvent::TokenRejected {
                        kind: TokenKind::Access,
                        failure,
                        route: route.to_string(),
                    })
                    .await;
            }
            return Err(e);
        }
    };

    let user = state
        .users
        .get(&claims.sub)
        .await?
        .ok_or(BearerGuardError::Authentication(AuthFailure::UnknownUser))?;

    Ok(CurrentUser { claims, user })
}

/// Admin role check on a resolved caller; denials are logged as security events
pub async fn authorize_admin(current: &CurrentUser, route: &str, state: &AppState) -> Result<()> {
    if let Err(e) = AccessGuard::admin().authorize(&current.claims) {
        state
            .security_log
            .log_event(SecurityEvent::AccessDenied {
                username: current.claims.sub.clone(),
                route: route.to_string(),
            })
            .await;
        return Err(e);
    }
    Ok(())
}

/// `POST /login?username=&password=`
pub async fn login(query: LoginQuery, state: SharedState) -> std::result::Result<impl Reply, Rejection> {
    let timer = AuthTimer::for_login();

    let user = match authenticate(state.users.as_ref(), &query.username, &query.password).await {
        Ok(user) => user,
        Err(e) => {
            state
                .security_log
                .log_event(SecurityEvent::LoginFailed {
                    username: query.username.clone(),
                })
                .await;
            timer.wait().await;
            return Err(reject(e));
        }
    };

    let pair = state
        .tokens
        .issue_pair(&user.username, user.role)
        .map_err(reject)?;

    state
        .security_log
        .log_event(SecurityEvent::LoginSucceeded {
            username: user.username.clone(),
        })
        .await;

    Ok(with_api_security_headers(warp::reply::json(&pair)))
}

/// `GET /me`
pub async fn me(current: CurrentUser) -> std::result::Result<impl Reply, Rejection> {
    Ok(with_api_security_headers(warp::reply::json(&current.user.profile())))
}

/// `GET /info`
pub async fn info(current: CurrentUser) -> std::result::Result<impl Reply, Rejection> {
    let user = current.user;
    let body = serde_json::json!({
        "username": user.username,
        "email": user.email,
        "role": user.role,
        "message": format!("Hello {}!", user.username),
    });
    Ok(with_api_security_headers(warp::reply::json(&body)))
}

/// `GET /users`
pub async fn list_users(
    current: CurrentUser,
    state: SharedState,
) -> std::result::Result<impl Reply, Rejection> {
    let users: Vec<UserSummary> = state
        .users
        .list()
        .await
        .map_err(reject)?
        .into_iter()
        .map(|u| UserSummary {
            username: u.username,
            role: u.role,
        })
        .collect();

    let body = serde_json::json!({
        "requested_by": current.user.username,
        "users": users,
    });
    Ok(with_api_security_headers(warp::reply::json(&body)))
}

/// `GET /admin-only`
pub async fn admin_only(
    current: CurrentUser,
    state: SharedState,
) -> std::result::Result<impl Reply, Rejection> {
    authorize_admin(&current, "/admin-only", &state)
        .await
        .map_err(reject)?;

    let body = serde_json::json!({
        "message": "Welcome admin!",
        "admin": current.claims.sub,
        "role": current.claims.role,
    });
    Ok(with_api_security_headers(warp::reply::json(&body)))
}

/// `POST /refresh` with `{ "refresh_token": ... }`
pub async fn refresh(
    request: RefreshRequest,
    state: SharedState,
) -> std::result::Result<impl Reply, Rejection> {
    match state.tokens.refresh(&request.refresh_token).await {
        Ok(pair) => Ok(with_api_security_headers(warp::reply::json(&pair))),
        Err(e) => {
            if let Some(failure) = e.auth_failure() {
                state
                    .security_log
                    .log_event(SecurityEvent::TokenRejected {
                        kind: TokenKind::Refresh,
                        failure,
                        route: "/refresh".to_string(),
                    })
                    .await;
            }
            Err(reject(e))
        }
    }
}

/// Revoke the presented access token and, when supplied, the refresh token
/// of the same user. Revoking an already revoked id is a no-op.
pub async fn revoke_session(
    current: &CurrentUser,
    refresh_token: Option<&str>,
    state: &AppState,
) -> Result<usize> {
    let mut to_revoke = vec![current.claims.clone()];

    if let Some(token) = refresh_token {
        match state.tokens.decode(token, TokenKind::Refresh) {
            Ok(claims) => {
                if claims.sub != current.claims.sub {
                    return Err(BearerGuardError::AccessDenied(
                        "Refresh token belongs to another user".to_string(),
                    ));
                }
                to_revoke.push(claims);
            }
            // Nothing left to invalidate
            Err(BearerGuardError::Authentication(AuthFailure::Expired)) => {}
            Err(e) => return Err(e),
        }
    }

    let mut revoked = 0;
    for claims in &to_revoke {
        if state.tokens.revoke(claims, RevocationReason::UserLogout).await? {
            revoked += 1;
            state
                .security_log
                .log_event(SecurityEvent::TokenRevoked {
                    username: claims.sub.clone(),
                    token_id: claims.jti.clone(),
                    kind: claims.token_type,
                })
                .await;
        }
    }

    Ok(revoked)
}

/// `POST /logout`
pub async fn logout(
    current: CurrentUser,
    body: warp::hyper::body::Bytes,
    state: SharedState,
) -> std::result::Result<impl Reply, Rejection> {
    let request: LogoutRequest = if body.iter().all(|b| b.is_ascii_whitespace()) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            reject(BearerGuardError::ValidationError(format!(
                "Invalid logout body: {}",
                e
            )))
        })?
    };

    let revoked = revoke_session(&current, request.refresh_token.as_deref(), &state)
        .await
        .map_err(reject)?;

    let response = LogoutResponse {
        message: format!("User {} logged out", current.user.username),
        revoked,
    };
    Ok(with_api_security_headers(warp::reply::json(&response)))
}

/// `GET /public`
pub async fn public() -> std::result::Result<impl Reply, Rejection> {
    let body = serde_json::json!({ "message": "This is public, no token needed" });
    Ok(with_api_security_headers(warp::reply::json(&body)))
}
