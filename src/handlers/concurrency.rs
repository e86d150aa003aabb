//! Blocking vs non-blocking handlers and sequential vs concurrent fetches
//!
//! `/sync` parks a blocking-pool thread for the whole delay; `/async` only
//! awaits a timer, so the runtime keeps serving other requests meanwhile.
//! `/profile/{id}` runs three simulated lookups concurrently, taking about
//! one fetch delay instead of three.

use futures_util::future::join3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use warp::{Rejection, Reply};

use crate::error::BearerGuardError;
use crate::security::with_api_security_headers;
use crate::state::SharedState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostsInfo {
    pub user_id: u32,
    pub posts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentsInfo {
    pub user_id: u32,
    pub comments: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    Sequential,
    #[default]
    Concurrent,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub mode: FetchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
    pub posts: PostsInfo,
    pub comments: CommentsInfo,
    pub mode: FetchMode,
    pub fetch_time: String,
    pub fetch_ms: u64,
}

pub async fn fetch_user(user_id: u32, delay: Duration) -> UserInfo {
    tokio::time::sleep(delay).await;
    UserInfo {
        id: user_id,
        name: format!("User{}", user_id),
    }
}

pub async fn fetch_posts(user_id: u32, delay: Duration) -> PostsInfo {
    tokio::time::sleep(delay).await;
    PostsInfo { user_id, posts: 5 }
}

pub async fn fetch_comments(user_id: u32, delay: Duration) -> CommentsInfo {
    tokio::time::sleep(delay).await;
    CommentsInfo {
        user_id,
        comments: 12,
    }
}

/// Load the three profile parts and report how long it took
pub async fn load_profile(user_id: u32, mode: FetchMode, delay: Duration) -> ProfileResponse {
    let start = Instant::now();

    let (user, posts, comments) = match mode {
        FetchMode::Sequential => {
            let user = fetch_user(user_id, delay).await;
            let posts = fetch_posts(user_id, delay).await;
            let comments = fetch_comments(user_id, delay).await;
            (user, posts, comments)
        }
        FetchMode::Concurrent => {
            join3(
                fetch_user(user_id, delay),
                fetch_posts(user_id, delay),
                fetch_comments(user_id, delay),
            )
            .await
        }
    };

    let elapsed = start.elapsed();
    ProfileResponse {
        user,
        posts,
        comments,
        mode,
        fetch_time: format!("{:.1}s", elapsed.as_secs_f64()),
        fetch_ms: elapsed.as_millis() as u64,
    }
}

/// `GET /profile/{id}?mode=sequential|concurrent`
pub async fn profile(
    user_id: u32,
    query: ProfileQuery,
    state: SharedState,
) -> Result<impl Reply, Rejection> {
    let response = load_profile(user_id, query.mode, state.demo.fetch_delay).await;
    log::debug!("Profile {} loaded ({:?}) in {}", user_id, response.mode, response.fetch_time);
    Ok(with_api_security_headers(warp::reply::json(&response)))
}

/// Run `work` on the blocking pool. A panic inside it becomes an internal error.
pub async fn run_blocking<F, T>(work: F) -> crate::error::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BearerGuardError::Internal(format!("Blocking task failed: {}", e)))
}

/// `GET /sync`
pub async fn sync_endpoint(state: SharedState) -> Result<impl Reply, Rejection> {
    let delay = state.demo.endpoint_delay;
    log::info!("[SYNC] start");

    run_blocking(move || std::thread::sleep(delay))
        .await
        .map_err(warp::reject::custom)?;

    log::info!("[SYNC] end");
    Ok(with_api_security_headers(warp::reply::json(
        &serde_json::json!({ "type": "sync" }),
    )))
}

/// `GET /async`
pub async fn async_endpoint(state: SharedState) -> Result<impl Reply, Rejection> {
    log::info!("[ASYNC] start");
    tokio::time::sleep(state.demo.endpoint_delay).await;
    log::info!("[ASYNC] end");
    Ok(with_api_security_headers(warp::reply::json(
        &serde_json::json!({ "type": "async" }),
    )))
}
