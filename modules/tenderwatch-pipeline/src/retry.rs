// Bounded retry policy shared by the source clients and the sender.
// Backoff grows as base * 3^attempt plus jitter so parallel subscriber
// tasks don't hammer an upstream in lockstep.

use std::time::Duration;

use rand::Rng;

/// Base backoff duration. Actual delay is base * 3^attempt + jitter.
const RETRY_BASE: Duration = Duration::from_millis(500);
const JITTER_MAX_MS: u64 = 250;

pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let jitter = Duration::from_millis(rand::rng().random_range(0..JITTER_MAX_MS));
    RETRY_BASE * 3u32.pow(attempt) + jitter
}

/// Timeouts, connection failures, rate limiting and server errors are worth
/// another attempt. Anything else (4xx, parse failures) is not.
pub(crate) fn is_transient_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    err.status().is_some_and(is_transient_status)
}

pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempts() {
        let first = backoff_delay(0);
        let third = backoff_delay(2);
        assert!(first >= RETRY_BASE);
        assert!(third >= RETRY_BASE * 9);
        assert!(third < RETRY_BASE * 9 + Duration::from_millis(JITTER_MAX_MS));
    }

    #[test]
    fn status_classification() {
        use reqwest::StatusCode;
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
    }
}
