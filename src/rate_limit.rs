use dashmap::DashMap;
use tokio::time::Instant;

// Token bucket per client key (usually the peer IP)
#[derive(Debug, Clone)]
pub struct TokenBucket {
    pub capacity: f64,
    pub refill_per_sec: f64,
    pub tokens: f64,
    pub last_refill: Instant,
}

impl TokenBucket {
    // New buckets start full
    pub fn new(capacity: f64, refill_per_sec: f64, now: Instant) -> Self {
        Self {
            capacity,
            refill_per_sec,
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    // Consumes a token only when one is available
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Registry of per-client buckets. Entries are created lazily and kept for
/// the life of the process.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: capacity.max(0.0),
            refill_per_sec: refill_per_sec.max(0.0),
        }
    }

    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();

        // entry() holds the shard lock for the insert and the update,
        // other shards stay free
        let mut bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_per_sec, now));

        bucket.try_acquire(now)
    }

    // Number of clients seen so far
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[cfg(test)]
    fn tokens(&self, client: &str) -> Option<f64> {
        self.buckets.get(client).map(|b| b.tokens)
    }
}

impl Default for RateLimiter {
    // One request per second sustained, burst of one
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn second_request_in_a_burst_is_denied() {
        let limiter = RateLimiter::default();
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
    }

    #[test]
    fn denial_does_not_consume_tokens() {
        let limiter = RateLimiter::default();
        assert!(limiter.allow("a"));
        for _ in 0..5 {
            assert!(!limiter.allow("a"));
        }
        let tokens = limiter.tokens("a").unwrap();
        assert!((0.0..1.0).contains(&tokens));
    }

    #[tokio::test(start_paused = true)]
    async fn requests_slower_than_refill_rate_are_always_allowed() {
        let limiter = RateLimiter::default();
        for _ in 0..20 {
            assert!(limiter.allow("slow-client"));
            tokio::time::advance(Duration::from_millis(1001)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_only_up_to_capacity() {
        let limiter = RateLimiter::default();
        assert!(limiter.allow("idle"));
        tokio::time::advance(Duration::from_secs(60)).await;

        assert!(limiter.allow("idle"));
        assert!(!limiter.allow("idle"));
        assert!(limiter.tokens("idle").unwrap() <= 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_refill_is_not_enough() {
        let limiter = RateLimiter::default();
        assert!(limiter.allow("k"));
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!limiter.allow("k"));
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(limiter.allow("k"));
    }

    #[test]
    fn larger_capacity_allows_a_burst() {
        let limiter = RateLimiter::new(3.0, 1.0);
        assert!(limiter.allow("burst"));
        assert!(limiter.allow("burst"));
        assert!(limiter.allow("burst"));
        assert!(!limiter.allow("burst"));
    }

    #[test]
    fn clients_are_isolated() {
        let limiter = RateLimiter::default();
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn concurrent_distinct_clients_do_not_interfere() {
        let limiter = RateLimiter::default();

        std::thread::scope(|s| {
            for t in 0..8 {
                let limiter = &limiter;
                s.spawn(move || {
                    for i in (t..1000).step_by(8) {
                        let key = format!("client-{}", i);
                        assert!(limiter.allow(&key));
                        assert!(!limiter.allow(&key));
                    }
                });
            }
        });

        assert_eq!(limiter.len(), 1000);
        for i in 0..1000 {
            let tokens = limiter.tokens(&format!("client-{}", i)).unwrap();
            assert!((0.0..1.0).contains(&tokens), "client-{} has {} tokens", i, tokens);
        }
    }
}
