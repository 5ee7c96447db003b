//! Retry with exponential backoff
//!
//! Thin policy layer over the `backoff` crate. The caller classifies errors;
//! anything not classified as transient fails on the spot.

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;

/// How often, and how patiently, a failed request is repeated
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Pause before the first retry
    pub first_delay: Duration,
    /// Upper bound for any single pause
    pub delay_cap: Duration,
    /// Growth factor between consecutive pauses
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::retries(2)
    }
}

impl RetryPolicy {
    /// Policy allowing `max_retries` extra attempts with the default pacing
    pub fn retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            first_delay: Duration::from_millis(200),
            delay_cap: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::retries(0)
    }

    /// Set the pause before the first retry
    pub fn with_first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = delay;
        self
    }

    /// Set the upper bound for a pause
    pub fn with_delay_cap(mut self, cap: Duration) -> Self {
        self.delay_cap = cap;
        self
    }

    /// Set the growth factor between pauses
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.first_delay)
            .with_max_interval(self.delay_cap)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(0.0)
            // Bounded by max_retries, not wall time
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `attempt` until it succeeds, hits a non-transient error, or the
/// policy runs out of retries
///
/// The error of the last attempt is returned unchanged.
pub async fn with_backoff<A, Fut, T, E>(
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut attempt: A,
) -> Result<T, E>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_retries = policy.max_retries;
    let is_transient = &is_transient;
    let mut made = 0u32;

    backoff::future::retry(policy.schedule(), || {
        made += 1;
        let number = made;
        let pending = attempt();

        async move {
            pending.await.map_err(|err| {
                if number <= max_retries && is_transient(&err) {
                    tracing::debug!(attempt = number, "Transient failure, backing off");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    })
    .await
}
