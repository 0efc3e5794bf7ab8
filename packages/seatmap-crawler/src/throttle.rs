//! Politeness throttle shared by every outbound request.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum wall-clock gap between successive `wait()` calls.
///
/// The check-and-update runs under one async mutex, and the sleep happens
/// while the lock is held, so concurrent callers are admitted one at a time
/// in lock acquisition order. The first call never waits.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last_at: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle. A zero delay disables waiting entirely.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_at: Mutex::new(None),
        }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until at least `delay` has passed since the previous call returned.
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        let mut last_at = self.last_at.lock().await;
        if let Some(previous) = *last_at {
            let remaining = self.delay.saturating_sub(previous.elapsed());
            if !remaining.is_zero() {
                tracing::trace!(wait_ms = remaining.as_millis() as u64, "Throttling request");
                tokio::time::sleep(remaining).await;
            }
        }
        *last_at = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let throttle = Throttle::new(Duration::from_secs(5));

        let start = Instant::now();
        throttle.wait().await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_consecutive_calls_are_spaced() {
        let throttle = Throttle::new(Duration::from_millis(200));

        throttle.wait().await;
        let start = Instant::now();
        throttle.wait().await;

        assert!(
            start.elapsed() >= Duration::from_millis(190),
            "Throttle not working: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_zero_delay_never_blocks() {
        let throttle = Throttle::disabled();

        let start = Instant::now();
        for _ in 0..50 {
            throttle.wait().await;
        }

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_spacing() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(100)));

        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.wait().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // First is immediate, the other three each wait a full delay
        assert!(
            start.elapsed() >= Duration::from_millis(290),
            "Concurrent callers bypassed throttle: {:?}",
            start.elapsed()
        );
    }
}
