//! Retry with per-attempt timeout and exponential backoff.
//!
//! Every attempt is bounded by `attempt_timeout`; an attempt that overruns
//! counts as a `Timeout` failure and is retried like any other transient
//! error.

use crate::config::{ResolverConfig, ResolverSettings};
use crate::error::{ResolveError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Exponential base (2.0 doubles the delay each retry).
    pub exponential_base: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: ResolverConfig::MAX_RETRIES + 1,
            base_delay: ResolverConfig::BACKOFF_BASE,
            max_delay: ResolverConfig::BACKOFF_MAX,
            exponential_base: 2.0,
            jitter: true,
            attempt_timeout: ResolverConfig::STANDALONE_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from runtime settings with the given per-attempt timeout.
    pub fn from_settings(settings: &ResolverSettings, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: settings.max_retries + 1,
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Duration::from_millis(settings.backoff_max_ms),
            exponential_base: 2.0,
            jitter: settings.backoff_jitter,
            attempt_timeout,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Calculate the delay after a failed attempt (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.exponential_base.powi(attempt as i32);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // Factor in [0.5, 1.5) keeps the mean delay without near-zero waits
            let mut rng = rand::rng();
            let jitter_factor = rng.random_range(0.5..1.5);
            (capped_secs * jitter_factor).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    pub attempts: u32,
    /// Total backoff delay slept.
    pub total_delay: Duration,
    pub success: bool,
    pub last_error: Option<String>,
}

/// Retry an async lookup, bounding each attempt by `config.attempt_timeout`.
///
/// Errors for which `should_retry` returns false end the loop immediately.
///
/// # Returns
///
/// A tuple of (Result, RetryStats)
pub async fn retry_with_timeout<F, Fut, T>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&ResolveError) -> bool,
) -> (Result<T>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut stats = RetryStats::default();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;

        let outcome = match tokio::time::timeout(config.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(config.attempt_timeout)),
        };

        let e = match outcome {
            Ok(value) => {
                stats.success = true;
                if attempt > 0 {
                    debug!("Lookup succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };

        stats.last_error = Some(e.to_string());

        if !should_retry(&e) {
            debug!("Error is not retryable: {}", e);
            return (Err(e), stats);
        }

        if attempt + 1 >= max_attempts {
            warn!(
                "All {} lookup attempts exhausted. Last error: {}",
                max_attempts, e
            );
            return (Err(e), stats);
        }

        let delay = config.calculate_delay(attempt);
        stats.total_delay += delay;

        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt + 1,
            max_attempts,
            e,
            delay
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
