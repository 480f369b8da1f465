use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use feedstore_core::config::FetchConfig;

use super::Fetcher;
use crate::source::{RawPayload, SourceDescriptor};

/// Growth factor for exponential backoff.
const BACKOFF_FACTOR: f64 = 1.5;

/// Upper bound of the random jitter added to exponential delays.
const JITTER_MAX_MS: u64 = 100;

/// Delay between failed attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    None,
    Constant(Duration),
    Exponential {
        initial: Duration,
        max: Duration,
        factor: f64,
        jitter: bool,
    },
}

impl Backoff {
    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Constant(delay) => *delay,
            Backoff::Exponential {
                initial,
                max,
                factor,
                jitter,
            } => {
                let exp = attempt.saturating_sub(1).min(32) as i32;
                let base_ms = (initial.as_millis() as f64 * factor.powi(exp)) as u64;
                let delay_ms = base_ms.min(max.as_millis() as u64);
                let jitter_ms = if *jitter {
                    rand::thread_rng().gen_range(0..JITTER_MAX_MS)
                } else {
                    0
                };
                Duration::from_millis(delay_ms + jitter_ms)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    /// Fixed attempt count, no delay between attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        let initial = Duration::from_millis(config.backoff_initial_ms);
        let backoff = match config.backoff.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Backoff::None,
            "constant" => Backoff::Constant(initial),
            "exponential" => Backoff::Exponential {
                initial,
                max: Duration::from_millis(config.backoff_max_ms),
                factor: BACKOFF_FACTOR,
                jitter: true,
            },
            other => {
                warn!(backoff = other, "unknown FETCH_BACKOFF, retrying without delay");
                Backoff::None
            }
        };
        Self::new(config.max_attempts).with_backoff(backoff)
    }
}

/// Wraps a [`Fetcher`] with a bounded retry budget.
pub struct RetryingFetcher {
    inner: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Fetch with retries. `None` means every attempt failed; the caller skips the cycle.
    pub async fn fetch(&self, source: &SourceDescriptor) -> Option<RawPayload> {
        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.inner.fetch_once(source).await {
                Ok(payload) => {
                    if attempt > 1 {
                        info!(source = %source.name, attempt, "fetch succeeded after retry");
                    }
                    return Some(payload);
                }
                Err(e) => {
                    warn!(
                        source = %source.name,
                        url = %source.url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "fetch attempt failed"
                    );
                    if attempt < max_attempts {
                        let delay = self.policy.backoff.delay_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
        error!(source = %source.name, url = %source.url, attempts = max_attempts, "fetch retries exhausted");
        None
    }
}
