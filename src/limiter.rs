use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter shared by every request against one tenant.
///
/// Refill is lazy: tokens accrue on `acquire`, not from a background task.
/// The mutex is held across the deficit sleep, so waiters are served in
/// arrival order; starvation under sustained overload is accepted.
pub struct RateLimiter {
    rate: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// `rate` is both the refill rate (tokens per second) and the bucket
    /// capacity. Must be > 0.
    pub fn new(rate: f64) -> Self {
        assert!(rate > 0.0, "rate must be positive");
        Self {
            rate,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Block until one token is available, then consume it.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.rate);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
        } else {
            // last_refill stays at lock time so the slept interval counts
            // toward the next refill.
            let wait = (1.0 - bucket.tokens) / self.rate;
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            bucket.tokens = 0.0;
        }
    }

    #[cfg(test)]
    async fn tokens(&self) -> f64 {
        self.bucket.lock().await.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn tokens_never_go_negative() {
        let limiter = RateLimiter::new(2.0);
        for _ in 0..10 {
            limiter.acquire().await;
            assert!(limiter.tokens().await >= 0.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn depleted_bucket_waits_for_refill() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();

        // First token is available immediately; the second has to wait
        // roughly one refill interval.
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn full_bucket_acquires_without_waiting() {
        let limiter = RateLimiter::new(5.0);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_serialize() {
        let limiter = Arc::new(RateLimiter::new(1.0));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // One immediate token; the rest queue on the mutex and wait out
        // at least one refill interval between them.
        assert!(start.elapsed() >= Duration::from_millis(900));
        assert!(limiter.tokens().await >= 0.0);
    }
}
