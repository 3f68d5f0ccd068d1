//! Request pacing for ranking runs

use crate::config::{BatchConfig, ThrottleKind};
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Token bucket that refills continuously and may go into debt.
/// A negative balance is the wait owed before the next request.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    min_refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(requests_per_minute: u32, burst: u32, now: Instant) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: f64::from(requests_per_minute.max(1)) / 60.0,
            min_refill_per_sec: 1.0 / 60.0,
            last_refill: now,
        }
    }

    /// Take one token, returning how long to wait before using it
    pub fn acquire(&mut self, now: Instant) -> Duration {
        self.refill(now);
        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.refill_per_sec)
        }
    }

    /// Halve the refill rate and drop any banked burst
    pub fn slow_down(&mut self) {
        self.refill_per_sec = (self.refill_per_sec / 2.0).max(self.min_refill_per_sec);
        self.tokens = self.tokens.min(0.0);
    }

    pub fn requests_per_minute(&self) -> f64 {
        self.refill_per_sec * 60.0
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

#[derive(Debug, Clone)]
pub enum Throttle {
    /// Fixed pause after every batch, whatever happened inside it
    BatchDelay(Duration),
    /// Per-request pacing that adapts to observed rate limits
    TokenBucket(TokenBucket),
}

impl Throttle {
    pub fn from_config(config: &BatchConfig) -> Self {
        match config.throttle {
            ThrottleKind::BatchDelay => Throttle::BatchDelay(Duration::from_secs(config.batch_delay_secs)),
            ThrottleKind::TokenBucket => Throttle::TokenBucket(TokenBucket::new(
                config.requests_per_minute,
                config.burst,
                Instant::now(),
            )),
        }
    }

    pub fn before_request(&mut self, now: Instant) -> Option<Duration> {
        match self {
            Throttle::BatchDelay(_) => None,
            Throttle::TokenBucket(bucket) => Some(bucket.acquire(now)).filter(|wait| !wait.is_zero()),
        }
    }

    pub fn after_batch(&self) -> Option<Duration> {
        match self {
            Throttle::BatchDelay(delay) => Some(*delay),
            Throttle::TokenBucket(_) => None,
        }
    }

    /// Feed back rate-limit responses absorbed by the retry layer
    pub fn observe_rate_limits(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        match self {
            Throttle::BatchDelay(_) => debug!("{} rate-limited responses this request", count),
            Throttle::TokenBucket(bucket) => {
                for _ in 0..count {
                    bucket.slow_down();
                }
                warn!(
                    "Rate limited by the model API, pacing reduced to {:.1} requests/minute",
                    bucket.requests_per_minute()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_allows_burst_then_paces() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(60, 2, start);

        assert_eq!(bucket.acquire(start), Duration::ZERO);
        assert_eq!(bucket.acquire(start), Duration::ZERO);
        assert_eq!(bucket.acquire(start), Duration::from_secs(1));
        // the debt from the previous call is paid off before this token is earned
        assert_eq!(bucket.acquire(start + Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn test_bucket_refills_up_to_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(60, 2, start);
        bucket.acquire(start);
        bucket.acquire(start);

        let later = start + Duration::from_secs(30);
        assert_eq!(bucket.acquire(later), Duration::ZERO);
        assert_eq!(bucket.acquire(later), Duration::ZERO);
        assert_eq!(bucket.acquire(later), Duration::from_secs(1));
    }

    #[test]
    fn test_slow_down_halves_rate_with_floor() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(4, 1, start);
        bucket.slow_down();
        assert!((bucket.requests_per_minute() - 2.0).abs() < 1e-9);
        for _ in 0..10 {
            bucket.slow_down();
        }
        assert!((bucket.requests_per_minute() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_delay_only_pauses_between_batches() {
        let mut throttle = Throttle::BatchDelay(Duration::from_secs(10));
        assert_eq!(throttle.before_request(Instant::now()), None);
        assert_eq!(throttle.after_batch(), Some(Duration::from_secs(10)));
        throttle.observe_rate_limits(2);
        assert_eq!(throttle.after_batch(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_token_bucket_throttle_ignores_batches() {
        let start = Instant::now();
        let mut throttle = Throttle::TokenBucket(TokenBucket::new(60, 1, start));
        assert_eq!(throttle.after_batch(), None);
        assert_eq!(throttle.before_request(start), None);
        assert_eq!(throttle.before_request(start), Some(Duration::from_secs(1)));
    }
}
