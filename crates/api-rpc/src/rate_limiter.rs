//! Rate Limiter (Token Bucket)
//!
//! Caps the request rate on the RPC surface. Submissions and polls go
//! through the same bucket.

use std::time::Instant;
use tokio::sync::Mutex;

/// Token bucket rate limiter
pub struct RateLimiter {
    state: Mutex<BucketState>,
    max_tokens: u32,
    refill_rate: u32, // tokens per second
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// `max_tokens` is the burst size, `refill_rate` the sustained
    /// tokens per second.
    pub fn new(max_tokens: u32, refill_rate: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: max_tokens as f64,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate,
        }
    }

    /// Check if a request is allowed (consumes 1 token)
    pub async fn check(&self) -> bool {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens =
            (state.tokens + elapsed * self.refill_rate as f64).min(self.max_tokens as f64);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_allows_within_burst() {
        let limiter = RateLimiter::new(10, 10);

        for _ in 0..10 {
            assert!(limiter.check().await);
        }

        assert!(!limiter.check().await);
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let limiter = RateLimiter::new(5, 10); // 10 tokens/sec

        for _ in 0..5 {
            assert!(limiter.check().await);
        }
        assert!(!limiter.check().await);

        sleep(Duration::from_millis(500)).await;

        assert!(limiter.check().await);
    }

    #[tokio::test]
    async fn test_never_exceeds_burst() {
        let limiter = RateLimiter::new(3, 1000);

        sleep(Duration::from_millis(100)).await;

        let mut allowed = 0;
        for _ in 0..10 {
            if limiter.check().await {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);
    }
}
