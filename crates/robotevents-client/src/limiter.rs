//! Process-wide spacing of outbound request dispatches
//!
//! One shared slot clock covers every traffic class. A caller reserves the
//! next free dispatch slot in a single synchronous step and then sleeps
//! until its slot arrives, so concurrent callers always hold distinct
//! slots at least the minimum interval apart. The slot marks the dispatch
//! start; response latency never widens the spacing.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Enforces a minimum interval between dispatch starts.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until this caller's dispatch slot arrives.
    ///
    /// The reservation itself never suspends; only the wait for an already
    /// claimed slot does.
    pub async fn acquire(&self) {
        if let Some(slot) = self.reserve() {
            sleep_until(slot).await;
        }
    }

    /// Claim the next free slot. `None` means dispatch immediately.
    fn reserve(&self) -> Option<Instant> {
        let mut next = self
            .next_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let slot = match *next {
            Some(at) if at > now => at,
            // Idle periods do not bank extra slots.
            _ => now,
        };
        *next = Some(slot + self.min_interval);
        (slot > now).then_some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_dispatch_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(250));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_dispatch_waits_out_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(250));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(
            start.elapsed() >= Duration::from_millis(250),
            "second dispatch must start at least min_interval after the first"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn each_slot_adds_one_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert_eq!(
            start.elapsed(),
            Duration::from_millis(300),
            "four dispatches occupy slots 0ms, 100ms, 200ms, 300ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_get_distinct_slots() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let a = tokio::spawn({
            let limiter = limiter.clone();
            async move {
                limiter.acquire().await;
                Instant::now()
            }
        });
        let b = tokio::spawn({
            let limiter = limiter.clone();
            async move {
                limiter.acquire().await;
                Instant::now()
            }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let gap = if a > b { a - b } else { b - a };
        assert!(
            gap >= Duration::from_millis(100),
            "concurrent dispatches must be spaced by min_interval, gap was {gap:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_period_does_not_bank_slots() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(
            start.elapsed(),
            Duration::ZERO,
            "a dispatch after a long idle gap must not wait"
        );
    }
}
