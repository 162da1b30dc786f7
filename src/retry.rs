use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::error::FetchError;

/// Errors that can tell whether another attempt is worthwhile
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Give up at the first non-retryable error instead of spending every attempt
    pub stop_on_permanent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            stop_on_permanent: false,
        }
    }
}

/// Retry an async operation according to `policy`.
///
/// Every failure is retried unless `stop_on_permanent` is set, in which case
/// non-retryable errors are returned immediately. When attempts run out the
/// last error is returned. A `max_attempts` of zero still runs once.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) if attempt >= max_attempts => {
                warn!("Giving up after {attempt} attempt(s): {e}");
                return Err(e);
            }
            Err(e) if policy.stop_on_permanent && !e.is_retryable() => {
                warn!("Attempt {attempt} failed permanently: {e}");
                return Err(e);
            }
            Err(e) => {
                debug!("Attempt {attempt} failed: {e}, retrying in {:?}", policy.delay);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
