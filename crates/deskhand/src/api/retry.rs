//! Backoff for transient API failures.
//!
//! Rate limits (429), server errors (5xx) and connect or timeout failures
//! are retried; anything else is returned at once.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::ApiError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
    /// Growth factor of the wait per attempt.
    pub multiplier: f64,
    /// Shorten each wait by a fixed per-attempt factor.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn none() -> Self {
        Self::with_retries(0)
    }

    /// Wait before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        let factor = if self.jitter {
            [0.75, 0.9, 0.6, 0.85][(attempt % 4) as usize]
        } else {
            1.0
        };
        Duration::from_secs_f64(secs * factor)
    }
}

/// Run `call`, retrying transient failures according to `config`.
pub async fn retry_api_call<T, F, Fut>(config: &RetryConfig, mut call: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < config.max_retries && e.is_transient() => {
                let delay = config.delay_for_attempt(attempt);
                warn!("{e}; retry {}/{} in {delay:?}", attempt + 1, config.max_retries);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
