use std::time::Duration;

use serde::Deserialize;

use super::transport::TransportError;

/// Bounded retry policy with a per-failure-class backoff table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// A rate-limited attempt `n` (1-based) waits `n * rate_limit_step_secs`.
    pub rate_limit_step_secs: u64,
    pub http_error_wait_secs: u64,
    pub timeout_wait_secs: u64,
    pub request_error_wait_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_step_secs: 10,
            http_error_wait_secs: 2,
            timeout_wait_secs: 5,
            request_error_wait_secs: 2,
        }
    }
}

/// Why a single attempt did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timeout")]
    Timeout,
    #[error("{0}")]
    Request(String),
}

impl From<TransportError> for Failure {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout => Failure::Timeout,
            TransportError::Request(message) => Failure::Request(message),
        }
    }
}

impl RetryPolicy {
    /// How long to wait after `failure` on the 1-based `attempt`.
    pub fn backoff(&self, failure: &Failure, attempt: u32) -> Duration {
        let secs = match failure {
            Failure::RateLimited => u64::from(attempt) * self.rate_limit_step_secs,
            Failure::Status { .. } => self.http_error_wait_secs,
            Failure::Timeout => self.timeout_wait_secs,
            Failure::Request(_) => self.request_error_wait_secs,
        };
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_table() {
        let policy = RetryPolicy::default();
        let status = Failure::Status {
            status: 500,
            body: String::new(),
        };

        assert_eq!(policy.backoff(&Failure::RateLimited, 1), Duration::from_secs(10));
        assert_eq!(policy.backoff(&Failure::RateLimited, 3), Duration::from_secs(30));
        assert_eq!(policy.backoff(&status, 1), Duration::from_secs(2));
        assert_eq!(policy.backoff(&status, 3), Duration::from_secs(2));
        assert_eq!(policy.backoff(&Failure::Timeout, 2), Duration::from_secs(5));
        assert_eq!(
            policy.backoff(&Failure::Request("reset".into()), 2),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn status_failure_message() {
        let failure = Failure::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(failure.to_string(), "API error 503: overloaded");
    }
}
