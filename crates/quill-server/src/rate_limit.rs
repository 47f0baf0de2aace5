//! Per-client token bucket admission control.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::RateLimitConfig;

/// Buckets idle this long are dropped when the map grows.
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(60);
const PRUNE_THRESHOLD: usize = 4096;

struct TokenBucket {
    /// Available tokens scaled by 1000.
    tokens_millis: u64,
    capacity_millis: u64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u64, refill_rate: f64) -> Self {
        Self {
            tokens_millis: capacity * 1000,
            capacity_millis: capacity * 1000,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill);
        let refill = (elapsed.as_secs_f64() * self.refill_rate * 1000.0) as u64;
        if refill > 0 {
            self.tokens_millis = (self.tokens_millis + refill).min(self.capacity_millis);
            self.last_refill = now;
        }

        if self.tokens_millis >= 1000 {
            self.tokens_millis -= 1000;
            true
        } else {
            false
        }
    }
}

/// Token buckets keyed by client address. Requests without a known peer
/// address share one bucket.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<Option<IpAddr>, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `client`; `false` when the bucket is empty.
    pub fn check(&self, client: Option<IpAddr>) -> bool {
        if !self.config.is_enabled() {
            return true;
        }
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("lock poisoned");
        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, b| now.duration_since(b.last_refill) < IDLE_BUCKET_TTL);
        }
        let capacity = self.config.burst.max(1);
        buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(capacity, self.config.requests_per_second))
            .try_acquire(now)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if limiter.check(client) {
        return next.run(request).await;
    }

    tracing::warn!(client = ?client, "rpc request rate limited");
    (StatusCode::TOO_MANY_REQUESTS, "too many requests").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Option<IpAddr> {
        Some(IpAddr::from([10, 0, 0, last]))
    }

    #[test]
    fn burst_then_reject() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_second: 1.0,
            burst: 3,
        });
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn clients_have_separate_buckets() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_second: 1.0,
            burst: 1,
        });
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
        assert!(limiter.check(None));
    }

    #[test]
    fn tokens_refill_over_time() {
        let mut bucket = TokenBucket::new(1, 10.0);
        let start = Instant::now();
        assert!(bucket.try_acquire(start));
        assert!(!bucket.try_acquire(start));
        assert!(bucket.try_acquire(start + Duration::from_millis(150)));
    }

    #[test]
    fn unlimited_never_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig::unlimited());
        for _ in 0..100 {
            assert!(limiter.check(ip(1)));
        }
    }
}
