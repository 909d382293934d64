//! Outbound politeness limiting for the remote site.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

/// Spaces outbound requests at a fixed interval.
///
/// A single-permit [`Semaphore`] is held for the interval after each
/// acquisition, so at most `requests_per_second` requests start per second
/// across every clone of the limiter. Zero disables limiting.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let interval = if requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(1000 / u64::from(requests_per_second))
        };

        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval,
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request slot is available.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        // The semaphore is never closed.
        let Ok(_permit) = self.semaphore.acquire().await else {
            return;
        };
        sleep(self.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_rate() {
        assert_eq!(RateLimiter::new(4).interval(), Duration::from_millis(250));
        assert_eq!(RateLimiter::new(0).interval(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unlimited_acquire_returns_immediately() {
        let limiter = RateLimiter::new(0);
        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_acquire_spaces_requests() {
        let limiter = RateLimiter::new(20);
        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        limiter.clone().acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
