//! End-to-end tests of the HTTP surface through warp's test client

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use bearer_guard::auth::token::{Claims, TokenKind, TokenManager};
use bearer_guard::auth::user::UserRole;
use bearer_guard::constants::MAX_BODY_BYTES;
use bearer_guard::routes::routes;
use bearer_guard::state::{AppState, DemoTimings, SharedState};
use bearer_guard::storage::token_revocation::create_memory_revocation_store;
use bearer_guard::storage::user_store::{create_memory_credential_store, seed_demo_users};

async fn state_with_timings(demo: DemoTimings) -> SharedState {
    let tokens = TokenManager::new(
        "http-access-key-91c4e7a02fd35b86",
        "http-refresh-key-3a8d5f16be07c249",
        create_memory_revocation_store(),
    );
    let users = create_memory_credential_store();
    seed_demo_users(users.as_ref(), "secret").await.unwrap();

    Arc::new(AppState::new(tokens, users).with_demo_timings(demo))
}

async fn test_state() -> SharedState {
    state_with_timings(DemoTimings::uniform(Duration::from_millis(10))).await
}

/// Token of `kind` for `username` that expired an hour ago
fn expired_token(state: &SharedState, username: &str, kind: TokenKind) -> String {
    let mut claims = Claims::new(username, UserRole::User, kind, chrono::Duration::minutes(15));
    claims.iat -= 7200;
    claims.nbf = claims.iat;
    claims.exp = claims.iat + 3600;
    state.tokens.encode_claims(&claims).unwrap()
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

async fn login(state: &SharedState, username: &str) -> Value {
    let res = warp::test::request()
        .method("POST")
        .path(&format!("/login?username={}&password=secret", username))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 200, "login failed for {}", username);
    json(res.body())
}

async fn get_with_token(state: &SharedState, path: &str, token: &str) -> (u16, Value) {
    let res = warp::test::request()
        .method("GET")
        .path(path)
        .header("authorization", format!("Bearer {}", token))
        .reply(&routes(state.clone()))
        .await;
    (res.status().as_u16(), json(res.body()))
}

#[tokio::test]
async fn test_public_and_health() {
    let state = test_state().await;
    let api = routes(state);

    let res = warp::test::request().path("/public").reply(&api).await;
    assert_eq!(res.status(), 200);
    assert_eq!(json(res.body())["message"], "This is public, no token needed");

    let res = warp::test::request().path("/health").reply(&api).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.body().as_ref(), b"OK");
}

#[tokio::test]
async fn test_login_returns_token_pair() {
    let state = test_state().await;
    let body = login(&state, "john").await;

    assert!(body["access_token"].as_str().unwrap().len() > 20);
    assert!(body["refresh_token"].as_str().unwrap().len() > 20);
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn test_login_with_bad_password_is_401() {
    let state = test_state().await;
    let res = warp::test::request()
        .method("POST")
        .path("/login?username=john&password=wrong")
        .reply(&routes(state))
        .await;

    assert_eq!(res.status(), 401);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");
    assert_eq!(json(res.body())["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_me_requires_token() {
    let state = test_state().await;
    let res = warp::test::request().path("/me").reply(&routes(state)).await;

    assert_eq!(res.status(), 401);
    assert_eq!(json(res.body())["error"], "missing_token");
}

#[tokio::test]
async fn test_me_and_info_with_access_token() {
    let state = test_state().await;
    let tokens = login(&state, "john").await;
    let access = tokens["access_token"].as_str().unwrap();

    let (status, me) = get_with_token(&state, "/me", access).await;
    assert_eq!(status, 200);
    assert_eq!(me["username"], "john");
    assert_eq!(me["role"], "user");
    assert!(me.get("password_hash").is_none());

    let (status, info) = get_with_token(&state, "/info", access).await;
    assert_eq!(status, 200);
    assert_eq!(info["message"], "Hello john!");
}

#[tokio::test]
async fn test_refresh_token_rejected_as_bearer() {
    let state = test_state().await;
    let tokens = login(&state, "john").await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let (status, body) = get_with_token(&state, "/me", refresh).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "bad_signature");
}

#[tokio::test]
async fn test_admin_only_route() {
    let state = test_state().await;

    let admin = login(&state, "admin").await;
    let (status, body) =
        get_with_token(&state, "/admin-only", admin["access_token"].as_str().unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(body["admin"], "admin");
    assert_eq!(body["role"], "admin");

    for username in ["john", "guest"] {
        let tokens = login(&state, username).await;
        let (status, body) =
            get_with_token(&state, "/admin-only", tokens["access_token"].as_str().unwrap()).await;
        assert_eq!(status, 403, "{} must be denied", username);
        assert_eq!(body["error"], "access_denied");
    }

    let (status, _) = get_with_token(&state, "/admin-only", "not-a-token").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_users_listing() {
    let state = test_state().await;
    let tokens = login(&state, "guest").await;

    let (status, body) =
        get_with_token(&state, "/users", tokens["access_token"].as_str().unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(body["requested_by"], "guest");
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_refresh_flow() {
    let state = test_state().await;
    let tokens = login(&state, "john").await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let res = warp::test::request()
        .method("POST")
        .path("/refresh")
        .json(&serde_json::json!({ "refresh_token": refresh }))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 200);
    let body = json(res.body());
    assert_eq!(body["refresh_token"], refresh);

    let (status, me) = get_with_token(&state, "/me", body["access_token"].as_str().unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(me["username"], "john");

    // An access token is not accepted as a refresh token
    let res = warp::test::request()
        .method("POST")
        .path("/refresh")
        .json(&serde_json::json!({ "refresh_token": tokens["access_token"] }))
        .reply(&routes(state))
        .await;
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh() {
    let state = test_state().await;
    let tokens = login(&state, "john").await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let res = warp::test::request()
        .method("POST")
        .path("/logout")
        .header("authorization", format!("Bearer {}", access))
        .json(&serde_json::json!({ "refresh_token": refresh }))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 200);
    let body = json(res.body());
    assert_eq!(body["message"], "User john logged out");
    assert_eq!(body["revoked"], 2);

    let (status, body) = get_with_token(&state, "/me", access).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "token_revoked");

    let res = warp::test::request()
        .method("POST")
        .path("/refresh")
        .json(&serde_json::json!({ "refresh_token": refresh }))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 401);
    assert_eq!(json(res.body())["error"], "token_revoked");

    // Logging out again is a no-op success
    let res = warp::test::request()
        .method("POST")
        .path("/logout")
        .header("authorization", format!("Bearer {}", access))
        .reply(&routes(state))
        .await;
    assert_eq!(res.status(), 200);
    assert_eq!(json(res.body())["revoked"], 0);
}

#[tokio::test]
async fn test_logout_rejects_foreign_refresh_token() {
    let state = test_state().await;
    let john = login(&state, "john").await;
    let guest = login(&state, "guest").await;

    let res = warp::test::request()
        .method("POST")
        .path("/logout")
        .header(
            "authorization",
            format!("Bearer {}", john["access_token"].as_str().unwrap()),
        )
        .json(&serde_json::json!({ "refresh_token": guest["refresh_token"] }))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 403);

    // Nothing was revoked
    assert_eq!(state.tokens.revocations().len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_profile_and_sync_async_endpoints() {
    let state = test_state().await;
    let api = routes(state);

    let res = warp::test::request().path("/profile/3").reply(&api).await;
    assert_eq!(res.status(), 200);
    let body = json(res.body());
    assert_eq!(body["user"]["name"], "User3");
    assert_eq!(body["mode"], "concurrent");

    let res = warp::test::request()
        .path("/profile/3?mode=sequential")
        .reply(&api)
        .await;
    assert_eq!(json(res.body())["mode"], "sequential");

    let res = warp::test::request().path("/sync").reply(&api).await;
    assert_eq!(json(res.body())["type"], "sync");

    let res = warp::test::request().path("/async").reply(&api).await;
    assert_eq!(json(res.body())["type"], "async");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let state = test_state().await;
    let res = warp::test::request().path("/nowhere").reply(&routes(state)).await;
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_token_for_deleted_user_is_unknown_user() {
    let state = test_state().await;
    let token = state.tokens.issue_access("ghost", UserRole::User).unwrap();

    let (status, body) = get_with_token(&state, "/me", &token).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "unknown_user");
}

#[tokio::test]
async fn test_login_with_missing_parameter_is_400() {
    let state = test_state().await;
    let res = warp::test::request()
        .method("POST")
        .path("/login?username=john")
        .reply(&routes(state))
        .await;

    assert_eq!(res.status(), 400);
    assert_eq!(json(res.body())["error"], "invalid_query");
}

#[tokio::test]
async fn test_oversized_bodies_are_413() {
    let state = test_state().await;
    let tokens = login(&state, "john").await;
    let oversized = vec![b' '; MAX_BODY_BYTES as usize + 1];

    let res = warp::test::request()
        .method("POST")
        .path("/logout")
        .header(
            "authorization",
            format!("Bearer {}", tokens["access_token"].as_str().unwrap()),
        )
        .body(oversized.clone())
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 413);
    assert_eq!(json(res.body())["error"], "payload_too_large");
    assert_eq!(state.tokens.revocations().len().await.unwrap(), 0);

    let res = warp::test::request()
        .method("POST")
        .path("/refresh")
        .body(oversized)
        .reply(&routes(state))
        .await;
    assert_eq!(res.status(), 413);
}

#[tokio::test]
async fn test_logout_skips_expired_refresh_token() {
    let state = test_state().await;
    let tokens = login(&state, "john").await;
    let stale_refresh = expired_token(&state, "john", TokenKind::Refresh);

    let res = warp::test::request()
        .method("POST")
        .path("/logout")
        .header(
            "authorization",
            format!("Bearer {}", tokens["access_token"].as_str().unwrap()),
        )
        .json(&serde_json::json!({ "refresh_token": stale_refresh }))
        .reply(&routes(state))
        .await;

    assert_eq!(res.status(), 200);
    assert_eq!(json(res.body())["revoked"], 1);
}

#[tokio::test]
async fn test_expired_access_token_is_401() {
    let state = test_state().await;
    let token = expired_token(&state, "john", TokenKind::Access);

    let res = warp::test::request()
        .path("/me")
        .header("authorization", format!("Bearer {}", token))
        .reply(&routes(state))
        .await;

    assert_eq!(res.status(), 401);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");
    assert_eq!(json(res.body())["error"], "token_expired");
}

#[tokio::test]
async fn test_admin_revokes_another_users_token() {
    let state = test_state().await;
    let admin = login(&state, "admin").await;
    let admin_access = admin["access_token"].as_str().unwrap().to_string();
    let john = login(&state, "john").await;
    let john_access = john["access_token"].as_str().unwrap().to_string();

    let revoke = |token: String| {
        let state = state.clone();
        let bearer = admin_access.clone();
        async move {
            warp::test::request()
                .method("POST")
                .path("/admin/revoke")
                .header("authorization", format!("Bearer {}", bearer))
                .json(&serde_json::json!({ "token": token }))
                .reply(&routes(state))
                .await
        }
    };

    let res = revoke(john_access.clone()).await;
    assert_eq!(res.status(), 200);
    let body = json(res.body());
    assert_eq!(body["subject"], "john");
    assert_eq!(body["token_type"], "access");
    assert_eq!(body["reason"], "AdminRevocation");
    assert_eq!(body["newly_revoked"], true);

    let (status, body) = get_with_token(&state, "/me", &john_access).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "token_revoked");

    let res = revoke(john_access.clone()).await;
    assert_eq!(json(res.body())["newly_revoked"], false);

    let res = revoke(john["refresh_token"].as_str().unwrap().to_string()).await;
    assert_eq!(json(res.body())["token_type"], "refresh");

    let res = revoke("garbage".to_string()).await;
    assert_eq!(res.status(), 400);

    let (status, stats) = get_with_token(&state, "/admin/revocations", &admin_access).await;
    assert_eq!(status, 200);
    assert_eq!(stats["revocations"]["total_revoked"], 2);
    assert_eq!(stats["revocations"]["by_reason"]["AdminRevocation"], 2);
    assert_eq!(stats["security_events"]["token_revoked"], 2);
}

#[tokio::test]
async fn test_admin_routes_deny_non_admins() {
    let state = test_state().await;
    let guest = login(&state, "guest").await;
    let access = guest["access_token"].as_str().unwrap();

    let res = warp::test::request()
        .method("POST")
        .path("/admin/revoke")
        .header("authorization", format!("Bearer {}", access))
        .json(&serde_json::json!({ "token": access }))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(res.status(), 403);
    assert_eq!(state.tokens.revocations().len().await.unwrap(), 0);

    let (status, _) = get_with_token(&state, "/admin/revocations", access).await;
    assert_eq!(status, 403);
}

#[tokio::test(start_paused = true)]
async fn test_non_stream_waits_for_all_records() {
    let state = state_with_timings(DemoTimings::default()).await;
    let start = tokio::time::Instant::now();

    let res = warp::test::request().path("/non-stream/data").reply(&routes(state)).await;

    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(res.status(), 200);
    let body = json(res.body());
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
    assert_eq!(body["users"][0]["name"], "Alice");
    assert_eq!(body["total_wait_time"], "3.0s");
}

#[tokio::test(start_paused = true)]
async fn test_stream_data_is_server_sent_events() {
    let state = state_with_timings(DemoTimings::default()).await;
    let res = warp::test::request().path("/stream/data").reply(&routes(state)).await;

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/event-stream");
    let body = String::from_utf8(res.body().to_vec()).unwrap();
    let payloads: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();
    assert_eq!(
        payloads,
        ["User 1: Alice", "User 2: Bob", "User 3: Charlie", "[DONE]"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stream_json_is_ndjson() {
    let state = state_with_timings(DemoTimings::default()).await;
    let start = tokio::time::Instant::now();
    let res = warp::test::request().path("/stream/json").reply(&routes(state)).await;

    assert!(start.elapsed() >= Duration::from_millis(2500));
    assert_eq!(res.headers()["content-type"], "application/x-ndjson");
    let body = String::from_utf8(res.body().to_vec()).unwrap();
    let records: Vec<Value> = body.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4]["name"], "User5");
}

#[tokio::test(start_paused = true)]
async fn test_stream_ai_response_and_compare() {
    let state = state_with_timings(DemoTimings::default()).await;
    let api = routes(state);

    let res = warp::test::request()
        .path("/stream/ai-response?prompt=Hello")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);
    let text = String::from_utf8(res.body().to_vec()).unwrap();
    assert!(text.starts_with("Async programming allows"));

    let res = warp::test::request().path("/compare").reply(&api).await;
    let body = json(res.body());
    assert_eq!(body["non_streaming"]["endpoint"], "/non-stream/data");
    assert_eq!(body["streaming"]["endpoints"].as_array().unwrap().len(), 3);
}
