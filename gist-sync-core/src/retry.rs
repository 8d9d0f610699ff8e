use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::contract::ContentFetcher;
use crate::error::FetchError;

/// Bounded exponential backoff for transient fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits. Handy for tests and local sources.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Fetches `reference`, retrying transient failures according to `policy`.
///
/// Non-transient failures are returned at once. When every attempt failed
/// transiently the result is [`FetchError::Exhausted`].
pub async fn fetch_with_retry<F>(
    fetcher: &F,
    reference: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError>
where
    F: ContentFetcher + ?Sized,
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match fetcher.fetch(reference).await {
            Ok(content) => return Ok(content),
            Err(FetchError::Transient { reason, .. }) if attempt >= attempts => {
                return Err(FetchError::Exhausted {
                    reference: reference.to_string(),
                    attempts,
                    reason,
                });
            }
            Err(e) if e.is_transient() => {
                let delay = policy.delay_after(attempt);
                warn!(
                    reference,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
