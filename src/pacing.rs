//! "Wait before the next call" policies.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// Delay of the default fixed pacer.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(200);

pub enum Pacer {
    /// Sleep a fixed amount after every call
    Fixed(Duration),
    /// Token bucket allowing N calls per minute
    Quota(RateLimiter<NotKeyed, InMemoryState, DefaultClock>),
}

impl Pacer {
    pub fn fixed(delay: Duration) -> Self {
        Pacer::Fixed(delay)
    }

    pub fn per_minute(calls: NonZeroU32) -> Self {
        Pacer::Quota(RateLimiter::direct(Quota::per_minute(calls)))
    }

    pub async fn wait(&self) {
        match self {
            Pacer::Fixed(delay) if delay.is_zero() => {}
            Pacer::Fixed(delay) => tokio::time::sleep(*delay).await,
            Pacer::Quota(limiter) => limiter.until_ready().await,
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Pacer::Fixed(DEFAULT_REQUEST_DELAY)
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pacer::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Pacer::Quota(_) => f.write_str("Quota"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_pacer_sleeps_the_full_delay() {
        let pacer = Pacer::default();
        let start = tokio::time::Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let pacer = Pacer::fixed(Duration::ZERO);
        let start = std::time::Instant::now();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn quota_allows_the_first_call_right_away() {
        let pacer = Pacer::per_minute(NonZeroU32::new(60).unwrap());
        let start = std::time::Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
