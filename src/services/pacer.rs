use governor::{clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed, Quota, RateLimiter};
use std::time::Duration;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Keeps successive provider calls at least `interval` apart.
///
/// Burst is fixed at one, so the first call goes through immediately and every
/// later call waits for its slot. A single pacer is shared by all concurrent
/// syncs so the process as a whole stays under the provider's rate ceiling.
pub struct Pacer {
    limiter: Option<DirectRateLimiter>,
    interval: Duration,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        // A zero period is rejected by governor; treat it as "no pacing".
        let limiter = Quota::with_period(interval).map(RateLimiter::direct);
        if limiter.is_none() {
            tracing::warn!("Catalog call pacing disabled (interval is zero)");
        }
        Self { limiter, interval }
    }

    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next call is allowed.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_spaces_calls_by_interval() {
        let pacer = Pacer::new(Duration::from_millis(50));
        let start = Instant::now();
        for _ in 0..3 {
            pacer.wait().await;
        }
        // first call is free, the next two each wait one interval
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_wait() {
        let pacer = Pacer::unpaced();
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(pacer.interval(), Duration::ZERO);
    }
}
