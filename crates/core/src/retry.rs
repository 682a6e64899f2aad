//! Bounded retry with exponential backoff.
//!
//! Reusable wrapper for any fallible async operation. The engine applies it
//! to block fetches, but nothing here is fetch-specific. Tuning lives in an
//! explicit [`RetryPolicy`] value carried by the indexer configuration;
//! there is no process-wide retry state.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

/// Outcome of a retried operation that never succeeded.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries only the final attempt's error.
    #[error("{0}")]
    Exhausted(E),

    /// The shutdown signal fired while waiting to retry.
    #[error("retry cancelled")]
    Cancelled,
}

/// Retry tuning for one indexer invocation.
///
/// Delays double between attempts, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget (first call included). Must be >= 1.
    pub attempts: u32,
    /// Base delay before the second attempt.
    pub delay: Duration,
    /// Upper bound for the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given failed attempt (1-based).
    ///
    /// Attempt 1 waits `delay`, attempt 2 waits `2 * delay`, and so on,
    /// saturating at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, the attempt budget is exhausted, or the
    /// shutdown signal fires.
    ///
    /// `on_retry` is invoked with the 1-based attempt number for every
    /// failed attempt; it is diagnostics only. Only the final attempt's
    /// error is surfaced. Cancellation interrupts a pending backoff sleep
    /// immediately rather than letting it elapse.
    pub async fn run<T, E, Fut, Op, OnRetry>(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        mut op: Op,
        mut on_retry: OnRetry,
    ) -> Result<T, RetryError<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        OnRetry: FnMut(u32, &E),
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if *shutdown.borrow() {
                return Err(RetryError::Cancelled);
            }
            attempt += 1;

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    on_retry(attempt, &err);
                    if attempt >= attempts {
                        return Err(RetryError::Exhausted(err));
                    }
                }
            }

            self.backoff(attempt, shutdown).await?;
        }
    }

    /// Sleep out the backoff for `attempt`, aborting early on shutdown.
    async fn backoff<E>(
        &self,
        attempt: u32,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), RetryError<E>> {
        let sleep = tokio::time::sleep(self.delay_for(attempt));
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = shutdown.changed() => match changed {
                    Ok(()) if *shutdown.borrow() => return Err(RetryError::Cancelled),
                    // Signal flipped back, keep sleeping.
                    Ok(()) => {}
                    // Sender gone: no cancellation can arrive anymore.
                    Err(_) => {
                        sleep.as_mut().await;
                        return Ok(());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(40),
        }
    }

    #[test]
    fn backoff_delays_double_and_cap() {
        let policy = RetryPolicy {
            attempts: 8,
            delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(30),
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(2), Duration::from_millis(800));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1600));

        // Non-décroissant jusqu'au plafond
        let mut prev = Duration::ZERO;
        for attempt in 1..=20 {
            let d = policy.delay_for(attempt);
            assert!(d >= prev);
            assert!(d <= Duration::from_secs(30));
            prev = d;
        }
    }

    #[tokio::test]
    async fn exhaustion_surfaces_only_last_error() {
        let (_tx, mut shutdown) = watch::channel(false);
        let calls = Arc::new(AtomicU32::new(0));
        let observed = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let observed_in = observed.clone();
        let result: Result<(), RetryError<String>> = quick_policy(5)
            .run(
                &mut shutdown,
                move || {
                    let n = calls_in.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Err(format!("attempt {n} failed")) }
                },
                move |_, _| {
                    observed_in.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        // Exactement `attempts` invocations, seule la dernière erreur remonte
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(observed.load(Ordering::SeqCst), 5);
        match result {
            Err(RetryError::Exhausted(msg)) => assert_eq!(msg, "attempt 5 failed"),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_retrying_once_successful() {
        let (_tx, mut shutdown) = watch::channel(false);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result: Result<u32, RetryError<&str>> = quick_policy(5)
            .run(
                &mut shutdown,
                move || {
                    let n = calls_in.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { if n < 3 { Err("transient") } else { Ok(n) } }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    // Test critique: l'annulation interrompt le backoff sans l'attendre
    #[tokio::test]
    async fn cancellation_interrupts_backoff_promptly() {
        let (tx, mut shutdown) = watch::channel(false);
        let policy = RetryPolicy {
            attempts: 5,
            delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
        };

        let started = std::time::Instant::now();
        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
            tx
        });

        let result: Result<(), RetryError<&str>> = policy
            .run(&mut shutdown, || async { Err("always") }, |_, _| {})
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(cancel.await);
    }

    #[tokio::test]
    async fn already_cancelled_never_invokes_op() {
        let (tx, mut shutdown) = watch::channel(false);
        tx.send(true).expect("receiver alive");

        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let result: Result<(), RetryError<&str>> = quick_policy(3)
            .run(
                &mut shutdown,
                move || {
                    calls_in.fetch_add(1, Ordering::SeqCst);
                    async { Err("never reached") }
                },
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
