//! Timing attack protection for the login endpoint
//!
//! A failed login for an unknown user skips the Argon2 verification and
//! would otherwise answer measurably faster than a wrong password.

use std::time::{Duration, Instant};

use crate::constants::LOGIN_FAILURE_MIN_MILLIS;

/// Pads a code path to a minimum wall-clock duration
pub struct AuthTimer {
    start: Instant,
    min_duration: Duration,
}

impl AuthTimer {
    pub fn new(min_duration: Duration) -> Self {
        Self {
            start: Instant::now(),
            min_duration,
        }
    }

    /// Timer using the login failure floor
    pub fn for_login() -> Self {
        Self::new(Duration::from_millis(LOGIN_FAILURE_MIN_MILLIS))
    }

    /// Wait until the minimum duration has elapsed
    pub async fn wait(self) {
        let elapsed = self.start.elapsed();
        if elapsed < self.min_duration {
            tokio::time::sleep(self.min_duration - elapsed).await;
        }
    }
}
