//! Rate limiting utilities

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Token-bucket rate limiter keyed per caller.
///
/// The daemon keys it by [`ClientId`]; any hashable key works.
#[derive(Debug)]
pub struct RateLimiter<K = ClientId> {
    max_tokens: u32,
    refill_interval: Duration,
    buckets: HashMap<K, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    /// Allow `max_requests` per `interval` for each key.
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_tokens: max_requests,
            refill_interval: interval,
            buckets: HashMap::new(),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate limited.
    pub fn check(&mut self, key: &K) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &K, now: Instant) -> bool {
        let max_tokens = self.max_tokens;
        let bucket = self.buckets.entry(key.clone()).or_insert(Bucket {
            tokens: max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill);
        if elapsed >= self.refill_interval && !self.refill_interval.is_zero() {
            let intervals = (elapsed.as_millis() / self.refill_interval.as_millis()) as u32;
            bucket.tokens = bucket
                .tokens
                .saturating_add(intervals.saturating_mul(max_tokens))
                .min(max_tokens);
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Forget a key, e.g. when its client disconnects
    pub fn remove(&mut self, key: &K) {
        self.buckets.remove(key);
    }

    /// Drop buckets not refilled within `stale_after`
    pub fn cleanup(&mut self, stale_after: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < stale_after);
    }

    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_limit() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        let client = ClientId::new();

        for _ in 0..5 {
            assert!(limiter.check(&client));
        }

        assert!(!limiter.check(&client));
    }

    #[test]
    fn keys_have_separate_buckets() {
        let mut limiter: RateLimiter<&str> = RateLimiter::new(2, Duration::from_secs(1));

        assert!(limiter.check(&"a"));
        assert!(limiter.check(&"a"));
        assert!(!limiter.check(&"a"));

        assert!(limiter.check(&"b"));
        assert!(limiter.check(&"b"));
    }

    #[test]
    fn refills_after_interval() {
        let mut limiter: RateLimiter<u8> = RateLimiter::new(1, Duration::from_millis(100));
        let start = Instant::now();

        assert!(limiter.check_at(&1, start));
        assert!(!limiter.check_at(&1, start + Duration::from_millis(50)));
        assert!(limiter.check_at(&1, start + Duration::from_millis(150)));
    }

    #[test]
    fn remove_forgets_key() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(60));
        let client = ClientId::new();

        assert!(limiter.check(&client));
        assert_eq!(limiter.tracked(), 1);
        limiter.remove(&client);
        assert_eq!(limiter.tracked(), 0);
        assert!(limiter.check(&client));
    }
}
