use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Retry configuration for outbound HTTP calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (typically 2.0)
    pub backoff_multiplier: f64,

    /// Whether to add jitter to prevent thundering herd
    pub use_jitter: bool,
}

impl RetryConfig {
    /// Defaults: 3 retries, 100ms initial delay, 5s cap, x2 backoff, jitter on.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// No retries at all.
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// What to do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Stop,
    Retry,
    /// Retry after a server-provided delay instead of the computed backoff.
    RetryAfter(Duration),
}

/// Retry an async operation with exponential backoff.
///
/// `classify` decides per error whether another attempt is worthwhile.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    mut operation: F,
    config: &RetryConfig,
    classify: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    C: Fn(&E) -> RetryDecision,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms.min(config.max_delay_ms);

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                let decision = classify(&e);
                if decision == RetryDecision::Stop {
                    return Err(e);
                }

                attempt += 1;
                if attempt > config.max_retries {
                    warn!(
                        "Operation failed after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let current_delay = match decision {
                    RetryDecision::RetryAfter(d) => (d.as_millis() as u64).min(config.max_delay_ms),
                    _ if config.use_jitter => apply_jitter(delay),
                    _ => delay,
                };

                warn!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                    attempt, config.max_retries, e, current_delay
                );

                tokio::time::sleep(Duration::from_millis(current_delay)).await;

                delay =
                    ((delay as f64 * config.backoff_multiplier) as u64).min(config.max_delay_ms);
            }
        }
    }
}

/// Scale a delay to a random value between 50% and 100% of itself.
fn apply_jitter(delay: u64) -> u64 {
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    (delay as f64 * factor) as u64
}
