use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Minimum-interval rate limiter for one agent.
///
/// This bounds how often requests start, not how many run at once. Each agent
/// owns its own limiter exclusively, so there is no locking and limiters of
/// different agents never coordinate.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter that spaces requests at least `min_interval` apart.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Create a limiter from a millisecond interval.
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// The configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// When the last request was admitted, if any.
    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// How long a caller would have to wait if it acquired now.
    pub fn remaining(&self) -> Duration {
        match self.last_request {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Wait until the minimum interval since the previous request has passed,
    /// then record the post-wait time as the new last-request timestamp.
    ///
    /// Returns the time spent waiting.
    pub async fn acquire(&mut self) -> Duration {
        let wait = self.remaining();
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiter delaying request");
            tokio::time::sleep(wait).await;
        }
        self.last_request = Some(Instant::now());
        wait
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_millis(2000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_does_not_wait() {
        let mut limiter = RateLimiter::from_millis(500);
        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::ZERO);
        assert!(limiter.last_request().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_acquires_are_spaced() {
        let mut limiter = RateLimiter::from_millis(500);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_only_covers_the_remainder() {
        let mut limiter = RateLimiter::from_millis(500);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(300)).await;
        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let mut limiter = RateLimiter::from_millis(100);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(limiter.remaining(), Duration::ZERO);
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiters_are_independent() {
        let mut a = RateLimiter::from_millis(1000);
        let mut b = RateLimiter::from_millis(1000);
        a.acquire().await;
        assert_eq!(b.acquire().await, Duration::ZERO);
    }
}
