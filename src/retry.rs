//! One reusable retry policy for every network boundary.
//!
//! The upload call and each per-page analysis call share the same failure
//! profile: transient 5xx/429 responses and network blips under concurrent
//! load. Rather than hand-rolling a retry loop at each call site, the
//! policy lives here once and is applied uniformly.
//!
//! Backoff is exponential (`base_delay * 2^(attempt-1)`): with the 500 ms
//! default and 3 retries the wait sequence is 500 ms → 1 s → 2 s, avoiding
//! the thundering-herd problem where concurrent workers retry in lockstep
//! against a recovering endpoint.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry policy: a maximum attempt budget and an exponential backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each retry after that.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted,
    /// sleeping the backoff between attempts. Returns the last error when
    /// every attempt fails.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut last_err: Option<E> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.backoff(attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    label,
                    attempt,
                    self.max_retries,
                    backoff.as_millis()
                );
                sleep(backoff).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("{}: attempt {} failed — {}", label, attempt + 1, e);
                    last_err = Some(e);
                }
            }
        }

        // max_retries + 1 attempts all failed; last_err is always Some here.
        Err(last_err.expect("at least one attempt ran"))
    }
}
