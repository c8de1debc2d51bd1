use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window ceiling on calls. The check and the recording of a call
/// happen under the same lock, so concurrent callers cannot both take the
/// last slot.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize) -> Self {
        Self::with_window(max_requests, RATE_WINDOW)
    }

    pub fn with_window(max_requests: usize, window: Duration) -> Self {
        RateLimiter {
            max_requests: max_requests.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Records a call if a slot is free, otherwise returns how long until
    /// the oldest call leaves the window.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() >= self.max_requests {
            let oldest = calls.front().copied().unwrap_or(now);
            return Err(self.window.saturating_sub(now.duration_since(oldest)));
        }

        calls.push_back(now);
        Ok(())
    }

    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

/// Whole seconds to wait, rounded up and never zero.
pub fn wait_secs(wait: Duration) -> u64 {
    (wait.as_secs_f64().ceil() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_and_window_roll() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            assert!(limiter.try_acquire().is_ok());
        }
        let wait = limiter.try_acquire().unwrap_err();
        assert_eq!(wait, RATE_WINDOW);
        assert_eq!(limiter.in_window(), 3);

        tokio::time::advance(Duration::from_secs(20)).await;
        let wait = limiter.try_acquire().unwrap_err();
        assert_eq!(wait_secs(wait), 40);

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(limiter.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_calls_do_not_consume_slots() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
        assert!(limiter.try_acquire().is_err());
        assert_eq!(limiter.in_window(), 1);
    }

    #[test]
    fn test_zero_ceiling_is_clamped() {
        assert_eq!(RateLimiter::new(0).max_requests(), 1);
    }

    #[test]
    fn test_wait_secs_rounds_up() {
        assert_eq!(wait_secs(Duration::from_millis(1)), 1);
        assert_eq!(wait_secs(Duration::from_millis(1500)), 2);
        assert_eq!(wait_secs(Duration::ZERO), 1);
    }
}
