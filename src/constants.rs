// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

// Token lifetimes
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
pub const MAX_ACCESS_TTL_MINUTES: u64 = 24 * 60;
pub const MAX_REFRESH_TTL_DAYS: u64 = 365;

// Bearer token sanity limits
pub const MAX_TOKEN_LENGTH: usize = 2048;
pub const BEARER_PREFIX: &str = "Bearer ";

// Largest request body accepted by JSON endpoints
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

// Minimum time spent answering a failed login
pub const LOGIN_FAILURE_MIN_MILLIS: u64 = 100;

// Password of every seeded demo account
pub const DEMO_PASSWORD: &str = "secret";
