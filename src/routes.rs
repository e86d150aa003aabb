//! Warp filter tree and rejection handling

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::hyper::body::{Buf, Bytes};
use warp::path::FullPath;
use warp::{Filter, Rejection, Reply};

use crate::constants::MAX_BODY_BYTES;
use crate::error::BearerGuardError;
use crate::handlers::auth::{self, CurrentUser};
use crate::handlers::{admin, concurrency, streaming};
use crate::security::with_api_security_headers;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
}

/// Helper function to include the shared state in a request
pub fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn current_user(
    state: SharedState,
    check_revocation: bool,
) -> impl Filter<Extract = (CurrentUser,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::path::full())
        .and(with_state(state))
        .and_then(
            move |header: Option<String>, path: FullPath, state: SharedState| async move {
                auth::resolve_current_user(header.as_deref(), path.as_str(), &state, check_revocation)
                    .await
                    .map_err(warp::reject::custom)
            },
        )
}

/// Requires a valid, unrevoked access token
pub fn with_access_token(
    state: SharedState,
) -> impl Filter<Extract = (CurrentUser,), Error = Rejection> + Clone {
    current_user(state, true)
}

/// Request body of at most `limit` bytes. Unlike `content_length_limit`, a
/// request without a body or without a `Content-Length` header is accepted.
pub fn bounded_body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and(warp::body::stream())
        .and(warp::any().map(move || limit))
        .and_then(read_bounded_body)
}

async fn read_bounded_body<S, B>(
    declared: Option<u64>,
    body: S,
    limit: u64,
) -> Result<Bytes, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let too_large = || warp::reject::custom(BearerGuardError::PayloadTooLarge(limit));

    if declared.map_or(false, |len| len > limit) {
        return Err(too_large());
    }

    futures_util::pin_mut!(body);
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|e| {
            warp::reject::custom(BearerGuardError::ValidationError(format!(
                "Failed to read request body: {}",
                e
            )))
        })?;
        if (buf.len() + chunk.remaining()) as u64 > limit {
            return Err(too_large());
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            let len = part.len();
            buf.extend_from_slice(part);
            chunk.advance(len);
        }
    }

    Ok(Bytes::from(buf))
}

/// Builds every route of the service, including rejection recovery
pub fn routes(
    state: SharedState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health").and(warp::path::end()).and(warp::get()).map(|| "OK");

    let public = warp::path("public")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(auth::public);

    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<auth::LoginQuery>())
        .and(with_state(state.clone()))
        .and_then(auth::login);

    let me = warp::path("me")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_access_token(state.clone()))
        .and_then(auth::me);

    let info = warp::path("info")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_access_token(state.clone()))
        .and_then(auth::info);

    let users = warp::path("users")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_access_token(state.clone()))
        .and(with_state(state.clone()))
        .and_then(auth::list_users);

    let admin_only = warp::path("admin-only")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_access_token(state.clone()))
        .and(with_state(state.clone()))
        .and_then(auth::admin_only);

    let refresh = warp::path("refresh")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<auth::RefreshRequest>())
        .and(with_state(state.clone()))
        .and_then(auth::refresh);

    // Logout accepts an already revoked access token so that repeating it
    // succeeds as a no-op.
    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::post())
        .and(current_user(state.clone(), false))
        .and(bounded_body(MAX_BODY_BYTES))
        .and(with_state(state.clone()))
        .and_then(auth::logout);

    let admin_revoke = warp::path!("admin" / "revoke")
        .and(warp::post())
        .and(with_access_token(state.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<admin::RevokeTokenRequest>())
        .and(with_state(state.clone()))
        .and_then(admin::revoke);

    let admin_stats = warp::path!("admin" / "revocations")
        .and(warp::get())
        .and(with_access_token(state.clone()))
        .and(with_state(state.clone()))
        .and_then(admin::revocation_stats);

    let sync = warp::path("sync")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(concurrency::sync_endpoint);

    let async_route = warp::path("async")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(concurrency::async_endpoint);

    let profile = warp::path!("profile" / u32)
        .and(warp::get())
        .and(warp::query::<concurrency::ProfileQuery>())
        .and(with_state(state.clone()))
        .and_then(concurrency::profile);

    let non_stream = warp::path!("non-stream" / "data")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(streaming::buffered_users);

    let stream_data = warp::path!("stream" / "data")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(streaming::stream_users);

    let stream_json = warp::path!("stream" / "json")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(streaming::stream_json);

    let stream_answer = warp::path!("stream" / "ai-response")
        .and(warp::get())
        .and(warp::query::<streaming::PromptQuery>())
        .and(with_state(state))
        .and_then(streaming::stream_answer);

    let compare = warp::path("compare")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(streaming::compare);

    health
        .or(public)
        .or(login)
        .or(me)
        .or(info)
        .or(users)
        .or(admin_only)
        .or(refresh)
        .or(logout)
        .or(admin_revoke)
        .or(admin_stats)
        .or(sync)
        .or(async_route)
        .or(profile)
        .or(non_stream)
        .or(stream_data)
        .or(stream_json)
        .or(stream_answer)
        .or(compare)
        .recover(handle_rejection)
}

/// Maps rejections to JSON error bodies with the matching status code
pub async fn handle_rejection(err: Rejection) -> Result<Box<dyn Reply>, Infallible> {
    let (status, code, detail) = if let Some(e) = err.find::<BearerGuardError>() {
        let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("Request failed: {}", e);
        }
        let detail = match e {
            BearerGuardError::Authentication(failure) => failure.to_string(),
            BearerGuardError::AccessDenied(msg) | BearerGuardError::ValidationError(msg) => {
                msg.clone()
            }
            BearerGuardError::PayloadTooLarge(_) => e.to_string(),
            _ => "Internal server error".to_string(),
        };
        (status, e.code().to_string(), detail)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found".to_string(), "Not found".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "invalid_query".to_string(), e.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "invalid_body".to_string(), e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large".to_string(),
            "Request body too large".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed".to_string(),
            "Method not allowed".to_string(),
        )
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error".to_string(),
            "Internal server error".to_string(),
        )
    };

    let reply = warp::reply::with_status(
        warp::reply::json(&ErrorBody { error: code, detail }),
        status,
    );

    let reply: Box<dyn Reply> = if status == StatusCode::UNAUTHORIZED {
        let reply = warp::reply::with_header(reply, "WWW-Authenticate", "Bearer");
        Box::new(with_api_security_headers(reply))
    } else {
        Box::new(with_api_security_headers(reply))
    };
    Ok(reply)
}
