//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::EngineError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Reject policies that cannot run or cannot compute a backoff.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_attempts == 0 {
            return Err(EngineError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(EngineError::Configuration(format!(
                "retry.multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Execute an async operation with retry.
    ///
    /// Only errors for which [`EngineError::is_retryable`] holds are retried;
    /// anything else is returned immediately. The operation always runs at
    /// least once.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let e = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !e.is_retryable() || attempt >= max_attempts {
                return Err(e);
            }

            tracing::warn!(
                attempt,
                max_attempts,
                error = %e,
                "Retrying after error"
            );

            let sleep_duration = match &e {
                EngineError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(*ms).min(self.max_backoff),
                _ => {
                    // Jitter: 75%-125% of backoff
                    let jitter_factor = 0.75 + (rand_factor() * 0.5);
                    self.clamp_secs(backoff.as_secs_f64() * jitter_factor)
                }
            };
            tokio::time::sleep(sleep_duration).await;

            backoff = self.clamp_secs(backoff.as_secs_f64() * self.multiplier);
            attempt += 1;
        }
    }

    /// Seconds to a duration capped at `max_backoff`; NaN or negative
    /// values fall back to `initial_backoff`.
    fn clamp_secs(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.initial_backoff)
            .min(self.max_backoff)
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}
