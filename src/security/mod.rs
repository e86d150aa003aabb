//! Security utilities for HTTP responses and authentication timing

pub mod headers;
pub mod timing;

pub use headers::with_api_security_headers;
pub use timing::AuthTimer;
