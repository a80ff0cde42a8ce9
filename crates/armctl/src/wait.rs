//! Polling for eventually consistent control-plane reads
//!
//! A server can stay visible to `get` for a while after its delete finished.
//! [`poll_until`] re-runs a check on an exponential schedule bounded by a
//! deadline, and tells the caller which of three things ended the wait.

use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Backoff schedule and deadline for [`poll_until`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay after the first unsuccessful check
    pub initial_delay: Duration,
    /// Cap on the delay between checks
    pub max_delay: Duration,
    /// Total time budget, measured from the first check
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15),
            timeout: Duration::from_secs(300),
        }
    }
}

impl WaitConfig {
    fn delays(&self) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .without_max_times()
            .build()
    }
}

/// Why a poll stopped without the condition holding
#[derive(Debug, PartialEq, Eq)]
pub enum WaitError<E> {
    /// The deadline passed; the last check was still negative
    TimedOut { checks: u32, elapsed: Duration },
    /// The token fired before the condition held
    Cancelled { checks: u32 },
    /// A check failed; polling stops on the first failure
    Check(E),
}

/// Run `check` until it yields `Ok(true)`, returning how many checks ran.
///
/// The final check happens at the deadline, never after it. A cancelled
/// token is honored both before each check and while sleeping.
pub async fn poll_until<F, Fut, E>(
    config: &WaitConfig,
    cancel: Option<&CancellationToken>,
    mut check: F,
) -> Result<u32, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let started = Instant::now();
    let deadline = started + config.timeout;
    let mut delays = config.delays();
    let mut checks = 0u32;

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(WaitError::Cancelled { checks });
        }

        checks += 1;
        if check().await.map_err(WaitError::Check)? {
            return Ok(checks);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::TimedOut {
                checks,
                elapsed: now - started,
            });
        }

        let nap = delays
            .next()
            .unwrap_or(config.max_delay)
            .min(deadline - now);
        trace!(checks, nap_ms = nap.as_millis() as u64, "Condition pending");

        match cancel {
            Some(token) => tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = token.cancelled() => return Err(WaitError::Cancelled { checks }),
            },
            None => tokio::time::sleep(nap).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config(timeout_ms: u64) -> WaitConfig {
        WaitConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reports_checks_used() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let checks = poll_until::<_, _, ()>(&config(5_000), None, || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
        })
        .await
        .unwrap();

        assert_eq!(checks, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn last_check_lands_on_the_deadline() {
        let started = Instant::now();
        let err = poll_until::<_, _, ()>(&config(100), None, || async { Ok(false) })
            .await
            .unwrap_err();

        // 10 + 20 + 40 + 30 (clamped to the deadline)
        assert_eq!(
            err,
            WaitError::TimedOut {
                checks: 5,
                elapsed: Duration::from_millis(100),
            }
        );
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_still_checks_once() {
        let err = poll_until::<_, _, ()>(&config(0), None, || async { Ok(false) })
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::TimedOut { checks: 1, .. }));

        let checks = poll_until::<_, _, ()>(&config(0), None, || async { Ok(true) })
            .await
            .unwrap();
        assert_eq!(checks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn check_failure_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = poll_until(&config(5_000), None, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<bool, _>("HTTP 500")
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err, WaitError::Check("HTTP 500"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            canceller.cancel();
        });

        let err = poll_until::<_, _, ()>(&config(5_000), Some(&token), || async { Ok(false) })
            .await
            .unwrap_err();
        // Checks at 0ms and 10ms; the token fires during the 20ms sleep
        assert_eq!(err, WaitError::Cancelled { checks: 2 });
    }

    #[tokio::test]
    async fn pre_cancelled_token_skips_checks() {
        let token = CancellationToken::new();
        token.cancel();
        let err = poll_until::<_, _, ()>(&config(5_000), Some(&token), || async { Ok(true) })
            .await
            .unwrap_err();
        assert_eq!(err, WaitError::Cancelled { checks: 0 });
    }
}
