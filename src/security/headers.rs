//! Security headers for API responses

/// Strict Content Security Policy for JSON endpoints
const STRICT_CSP: &str = "default-src 'none'; frame-ancestors 'none';";

/// Wrap a reply with strict security headers for API endpoints.
///
/// Token responses must never be cached by intermediaries.
pub fn with_api_security_headers<T: warp::Reply>(reply: T) -> impl warp::Reply {
    let reply = warp::reply::with_header(reply, "X-Frame-Options", "DENY");
    let reply = warp::reply::with_header(reply, "X-Content-Type-Options", "nosniff");
    let reply = warp::reply::with_header(reply, "Referrer-Policy", "no-referrer");
    let reply = warp::reply::with_header(reply, "Content-Security-Policy", STRICT_CSP);
    warp::reply::with_header(reply, "Cache-Control", "no-store")
}
