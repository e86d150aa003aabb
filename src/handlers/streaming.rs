//! Buffered vs streamed responses
//!
//! `/non-stream/data` waits for every record before answering. The
//! `/stream/*` routes send each record as soon as it is produced: Server-Sent
//! Events, newline-delimited JSON and a plain-text word stream.

use chrono::Utc;
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::Instant;
use warp::http::header::CONTENT_TYPE;
use warp::http::Response;
use warp::hyper::Body;
use warp::sse::Event;
use warp::{Rejection, Reply};

use crate::error::BearerGuardError;
use crate::security::with_api_security_headers;
use crate::state::SharedState;

static DEMO_USERS: [&str; 3] = ["Alice", "Bob", "Charlie"];
const NDJSON_RECORDS: u32 = 5;
const DEFAULT_PROMPT: &str = "Tell me about async programming";
const AI_RESPONSE_TEXT: &str = "Async programming allows you to run multiple tasks concurrently \
    without blocking. It uses await and async/await syntax to pause execution at I/O points. \
    This is perfect for handling multiple requests in servers efficiently.";

/// Marks the end of the `/stream/data` event stream
pub const STREAM_DONE: &str = "[DONE]";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemoUser {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamedUser {
    pub id: u32,
    pub name: String,
    /// Seconds since the Unix epoch when the record was produced
    pub timestamp: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BufferedUsers {
    pub users: Vec<DemoUser>,
    pub total_wait_time: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptQuery {
    pub prompt: Option<String>,
}

/// Produce every demo user, one per `delay`, and only then return them
pub async fn collect_users(delay: Duration) -> Vec<DemoUser> {
    let mut users = Vec::with_capacity(DEMO_USERS.len());
    for (i, name) in DEMO_USERS.iter().enumerate() {
        tokio::time::sleep(delay).await;
        users.push(DemoUser {
            id: i as u32 + 1,
            name: name.to_string(),
        });
    }
    users
}

/// Event payloads of `/stream/data`: one user per `delay`, then the end marker
pub fn user_events(delay: Duration) -> impl Stream<Item = String> + Send + 'static {
    stream::iter(DEMO_USERS.iter().enumerate())
        .then(move |(i, name)| async move {
            tokio::time::sleep(delay).await;
            format!("User {}: {}", i + 1, name)
        })
        .chain(stream::once(async { STREAM_DONE.to_string() }))
}

/// Lines of `/stream/json`: one JSON object per `delay`, each ending in `\n`
pub fn user_lines(delay: Duration) -> impl Stream<Item = String> + Send + 'static {
    stream::iter(1..=NDJSON_RECORDS).then(move |id| async move {
        tokio::time::sleep(delay).await;
        let user = StreamedUser {
            id,
            name: format!("User{}", id),
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        };
        let mut line = serde_json::to_string(&user).unwrap_or_default();
        line.push('\n');
        line
    })
}

/// Words of the simulated model answer, one per `delay`, each followed by a space
pub fn answer_words(delay: Duration) -> impl Stream<Item = String> + Send + 'static {
    stream::iter(AI_RESPONSE_TEXT.split_whitespace()).then(move |word| async move {
        tokio::time::sleep(delay).await;
        format!("{} ", word)
    })
}

fn streamed_body<S>(content_type: &str, chunks: S) -> Result<impl Reply, Rejection>
where
    S: Stream<Item = String> + Send + 'static,
{
    let body = Body::wrap_stream(chunks.map(Ok::<_, Infallible>));
    let response = Response::builder()
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| {
            warp::reject::custom(BearerGuardError::Internal(format!(
                "Failed to build streamed response: {}",
                e
            )))
        })?;
    Ok(with_api_security_headers(response))
}

/// `GET /non-stream/data`
pub async fn buffered_users(state: SharedState) -> Result<impl Reply, Rejection> {
    let start = Instant::now();
    let users = collect_users(state.demo.chunk_delay).await;
    let body = BufferedUsers {
        users,
        total_wait_time: format!("{:.1}s", start.elapsed().as_secs_f64()),
    };
    Ok(with_api_security_headers(warp::reply::json(&body)))
}

/// `GET /stream/data` as Server-Sent Events
pub async fn stream_users(state: SharedState) -> Result<impl Reply, Rejection> {
    let events = user_events(state.demo.chunk_delay)
        .map(|payload| Ok::<_, Infallible>(Event::default().data(payload)));
    Ok(with_api_security_headers(warp::sse::reply(events)))
}

/// `GET /stream/json` as newline-delimited JSON
pub async fn stream_json(state: SharedState) -> Result<impl Reply, Rejection> {
    streamed_body("application/x-ndjson", user_lines(state.demo.line_delay))
}

/// `GET /stream/ai-response?prompt=`
pub async fn stream_answer(
    query: PromptQuery,
    state: SharedState,
) -> Result<impl Reply, Rejection> {
    let prompt = query.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    log::debug!("Streaming simulated answer for prompt: {}", prompt);
    streamed_body("text/plain; charset=utf-8", answer_words(state.demo.word_delay))
}

/// `GET /compare`
pub async fn compare() -> Result<impl Reply, Rejection> {
    let body = serde_json::json!({
        "non_streaming": {
            "description": "Entire response sent at once",
            "client_wait_time": "3 seconds",
            "use_case": "Small data, simple APIs",
            "endpoint": "/non-stream/data",
        },
        "streaming": {
            "description": "Data sent in chunks progressively",
            "client_wait_time": "First chunk: 1s, Last chunk: 3s",
            "use_case": "Large data, AI responses, real-time updates",
            "endpoints": ["/stream/data", "/stream/ai-response", "/stream/json"],
        },
    });
    Ok(with_api_security_headers(warp::reply::json(&body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "expected about {:?}, got {:?}",
            expected,
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_users_arrive_together() {
        let start = Instant::now();
        let users = collect_users(Duration::from_secs(1)).await;

        assert_elapsed(start, Duration::from_secs(3));
        assert_eq!(users.len(), 3);
        assert_eq!(users[2], DemoUser { id: 3, name: "Charlie".into() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_arrive_one_delay_apart() {
        let start = Instant::now();
        let mut events = Box::pin(user_events(Duration::from_secs(1)));

        assert_eq!(events.next().await.unwrap(), "User 1: Alice");
        assert_elapsed(start, Duration::from_secs(1));

        assert_eq!(events.next().await.unwrap(), "User 2: Bob");
        assert_eq!(events.next().await.unwrap(), "User 3: Charlie");
        assert_elapsed(start, Duration::from_secs(3));

        assert_eq!(events.next().await.unwrap(), STREAM_DONE);
        assert_elapsed(start, Duration::from_secs(3));
        assert!(events.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_json_lines_are_individual_records() {
        let start = Instant::now();
        let lines: Vec<String> = user_lines(Duration::from_millis(500)).collect().await;

        assert_elapsed(start, Duration::from_millis(2500));
        assert_eq!(lines.len(), 5);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.ends_with('\n'));
            let user: StreamedUser = serde_json::from_str(line.trim_end()).unwrap();
            assert_eq!(user.id, i as u32 + 1);
            assert_eq!(user.name, format!("User{}", i + 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_words_rebuild_text() {
        let words: Vec<String> = answer_words(Duration::from_millis(100)).collect().await;
        let text: String = words.concat();

        assert_eq!(text.trim_end(), AI_RESPONSE_TEXT.split_whitespace().collect::<Vec<_>>().join(" "));
        assert!(words.iter().all(|w| w.ends_with(' ')));
    }
}
