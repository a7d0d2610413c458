use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota,
};

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Spaces outbound requests evenly so the provider never sees more than
/// `requests_per_second` calls in any one-second window.
///
/// Shared by every resolve call in the process. Burst is one, so an idle limiter never
/// releases a backlog of requests at once.
pub struct RateLimiter {
    inner: DirectLimiter,
}

impl RateLimiter {
    pub fn per_second(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rps).allow_burst(NonZeroU32::MIN);
        Self {
            inner: governor::RateLimiter::direct(quota),
        }
    }

    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[tokio::test]
    async fn test_requests_are_spaced_by_interval() {
        let limiter = RateLimiter::per_second(20);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        // First slot is immediate, then one every 50 ms.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(180), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_idle_limiter_does_not_accumulate_burst() {
        let limiter = RateLimiter::per_second(10);
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(80), "{elapsed:?}");
    }
}
