use dashmap::DashMap;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Spaces out requests to the same host.
///
/// Each caller reserves the next free slot for its host before sleeping, so
/// concurrent tasks hitting one host queue up instead of all waking at once.
pub struct RateLimiter {
    min_delay: Duration,
    next_slot: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: DashMap::new(),
        }
    }

    /// Wait until a request to `host` is allowed.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let slot = {
            let mut entry = self.next_slot.entry(host.to_string()).or_insert(now);
            let slot = (*entry).max(now);
            *entry = slot + self.min_delay;
            slot
        };

        if slot > now {
            tracing::trace!(host, delay_ms = (slot - now).as_millis() as u64, "rate limited");
            sleep_until(slot).await;
        }
    }

    pub fn tracked_hosts(&self) -> usize {
        self.next_slot.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_request_to_same_host_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        let start = Instant::now();
        limiter.wait("cookpad.com").await;
        limiter.wait("cookpad.com").await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn hosts_are_independent() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        let start = Instant::now();
        limiter.wait("a.example").await;
        limiter.wait("b.example").await;
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert_eq!(limiter.tracked_hosts(), 2);
    }

    #[tokio::test]
    async fn zero_delay_tracks_nothing() {
        let limiter = RateLimiter::new(Duration::ZERO);
        limiter.wait("a.example").await;
        assert_eq!(limiter.tracked_hosts(), 0);
    }
}
