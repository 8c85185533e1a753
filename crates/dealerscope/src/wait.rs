//! Bounded polling waits.
//!
//! Every wait in the crate goes through [`poll_until`]: the condition is checked,
//! and if it yields nothing the task sleeps for one poll interval (clamped to
//! the remaining time) and tries again until the deadline. A wait therefore
//! never outlives its timeout by more than one condition check.
//!
//! Time comes from `tokio::time`, so tests can run these loops under paused
//! virtual time.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::result::ScopeResult;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq)]
pub struct WaitResult<T> {
    /// Value produced by the condition, `None` on timeout
    pub value: Option<T>,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of condition checks
    pub attempts: u32,
}

impl<T> WaitResult<T> {
    /// Whether the condition produced a value before the deadline
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.value.is_some()
    }

    /// Discard timing information
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

/// Poll `condition` until it yields a value or `timeout` passes.
///
/// Condition errors that are structural (see [`crate::ScopeError::is_structural`])
/// end the wait and propagate. Any other error counts as "not yet".
///
/// # Errors
///
/// Returns the first structural error raised by the condition.
pub async fn poll_until_timed<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut condition: F,
) -> ScopeResult<WaitResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScopeResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match condition().await {
            Ok(Some(value)) => {
                return Ok(WaitResult {
                    value: Some(value),
                    elapsed: start.elapsed(),
                    attempts,
                })
            }
            Ok(None) => trace!(attempts, "condition not met yet"),
            Err(e) if e.is_structural() => return Err(e),
            Err(e) => debug!(error = %e, attempts, "condition check failed, polling again"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitResult {
                value: None,
                elapsed: start.elapsed(),
                attempts,
            });
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Poll `condition` until it yields a value; `None` once `timeout` has passed.
///
/// # Errors
///
/// Returns the first structural error raised by the condition.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    condition: F,
) -> ScopeResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScopeResult<Option<T>>>,
{
    Ok(poll_until_timed(timeout, interval, condition).await?.value)
}

/// Fixed sleep between attempts; no-op for a zero duration
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::ScopeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TIMEOUT: Duration = Duration::from_secs(5);
    const INTERVAL: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success() {
        let result = poll_until_timed(TIMEOUT, INTERVAL, || async { Ok(Some(7)) })
            .await
            .unwrap();
        assert_eq!(result.value, Some(7));
        assert_eq!(result.attempts, 1);
        assert_eq!(result.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_polls() {
        let calls = &AtomicU32::new(0);
        let result = poll_until_timed(TIMEOUT, INTERVAL, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok((n >= 2).then_some(n))
        })
        .await
        .unwrap();
        assert_eq!(result.value, Some(2));
        assert_eq!(result.attempts, 3);
        assert_eq!(result.elapsed, INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_true_returns_none_at_deadline() {
        let start = Instant::now();
        let value: Option<()> = poll_until(TIMEOUT, INTERVAL, || async { Ok(None) })
            .await
            .unwrap();
        assert!(value.is_none());
        let elapsed = start.elapsed();
        assert!(elapsed >= TIMEOUT);
        assert!(elapsed <= TIMEOUT + INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_clamped_to_deadline() {
        let start = Instant::now();
        let _: Option<()> = poll_until(
            Duration::from_millis(300),
            Duration::from_secs(10),
            || async { Ok(None) },
        )
        .await
        .unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_keep_polling() {
        let calls = &AtomicU32::new(0);
        let value = poll_until(TIMEOUT, INTERVAL, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ScopeError::StaleElement { id: "el-1".into() })
            } else {
                Ok(Some("ok"))
            }
        })
        .await
        .unwrap();
        assert_eq!(value, Some("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_structural_error_stops_wait() {
        let calls = &AtomicU32::new(0);
        let err = poll_until::<(), _, _>(TIMEOUT, INTERVAL, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScopeError::config("bad"))
        })
        .await
        .unwrap_err();
        assert!(err.is_structural());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_zero_is_noop() {
        let start = Instant::now();
        settle(Duration::ZERO).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        settle(Duration::from_secs(1)).await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
