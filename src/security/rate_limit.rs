//! Token bucket rate limiting middleware.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;

use crate::config::{LimiterConfig, LimiterScope};
use crate::http::response::ApiError;
use crate::http::server::AppState;

const GLOBAL_KEY: &str = "global";
const UNKNOWN_CLIENT: &str = "unknown";

/// A token bucket with lazy refill.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_update {
            self.last_update = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state: one bucket per key behind a mutex.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    enabled: bool,
    scope: LimiterScope,
    rps: f64,
    burst: f64,
    idle_timeout: Duration,
}

impl RateLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            scope: config.scope,
            rps: config.rps,
            burst: f64::from(config.burst),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Bucket key for a client, honoring the configured scope.
    pub fn key_for(&self, client: Option<SocketAddr>) -> String {
        match (self.scope, client) {
            (LimiterScope::Global, _) => GLOBAL_KEY.to_string(),
            (LimiterScope::PerClient, Some(addr)) => addr.ip().to_string(),
            (LimiterScope::PerClient, None) => UNKNOWN_CLIENT.to_string(),
        }
    }

    /// Try to take one token for `key`.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        let mut buckets = self.lock();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, now));

        bucket.try_acquire(self.burst, self.rps, now)
    }

    /// Drop buckets that have been idle past the timeout and would be full
    /// on their next access, so eviction never hands out extra tokens.
    /// Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, b| {
            let idle = now.saturating_duration_since(b.last_update);
            let refilled = b.tokens + idle.as_secs_f64() * self.rps;
            idle < self.idle_timeout || refilled < self.burst
        });
        before - buckets.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    // A panic while holding the lock cannot leave a bucket half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Periodically evict idle buckets until the task is dropped.
pub async fn run_sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;
        let evicted = limiter.evict_idle();
        if evicted > 0 {
            tracing::debug!(
                evicted,
                remaining = limiter.tracked_keys(),
                "Evicted idle rate limiter buckets"
            );
        }
    }
}

/// Middleware rejecting requests with 429 once a client's bucket is empty.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.limiter.enabled() {
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = state.limiter.key_for(client);

    if state.limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        state.metrics.record_rate_limited();
        ApiError::RateLimited.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rps: f64, burst: u32, idle_timeout_secs: u64) -> LimiterConfig {
        LimiterConfig {
            enabled: true,
            rps,
            burst,
            scope: LimiterScope::PerClient,
            idle_timeout_secs,
        }
    }

    fn limiter(rps: f64, burst: u32, enabled: bool, scope: LimiterScope) -> RateLimiter {
        RateLimiter::new(&LimiterConfig {
            enabled,
            scope,
            ..config(rps, burst, 180)
        })
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = limiter(5.0, 10, true, LimiterScope::PerClient);
        let now = Instant::now();

        for i in 0..10 {
            assert!(limiter.check_at("1.2.3.4", now), "request {} should pass", i + 1);
        }
        assert!(!limiter.check_at("1.2.3.4", now));
    }

    #[test]
    fn test_refills_over_time() {
        let limiter = limiter(5.0, 2, true, LimiterScope::PerClient);
        let start = Instant::now();

        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start));

        // 1/rps = 200ms
        let later = start + Duration::from_millis(250);
        assert!(limiter.check_at("a", later));
        assert!(!limiter.check_at("a", later));
    }

    #[test]
    fn test_refill_is_capped_at_burst() {
        let limiter = limiter(100.0, 3, true, LimiterScope::PerClient);
        let start = Instant::now();
        assert!(limiter.check_at("a", start));

        let later = start + Duration::from_secs(60);
        for _ in 0..3 {
            assert!(limiter.check_at("a", later));
        }
        assert!(!limiter.check_at("a", later));
    }

    #[test]
    fn test_clock_going_backwards_does_not_refill() {
        let limiter = limiter(1.0, 1, true, LimiterScope::PerClient);
        let start = Instant::now() + Duration::from_secs(10);

        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start - Duration::from_secs(5)));
        assert!(!limiter.check_at("a", start));
    }

    #[test]
    fn test_disabled_admits_everything() {
        let limiter = limiter(0.1, 1, false, LimiterScope::PerClient);
        let now = Instant::now();
        for _ in 0..1000 {
            assert!(limiter.check_at("a", now));
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_per_client_buckets_are_independent() {
        let limiter = limiter(1.0, 1, true, LimiterScope::PerClient);
        let a: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let b: SocketAddr = "10.0.0.2:5000".parse().unwrap();
        let now = Instant::now();

        assert!(limiter.check_at(&limiter.key_for(Some(a)), now));
        assert!(!limiter.check_at(&limiter.key_for(Some(a)), now));
        assert!(limiter.check_at(&limiter.key_for(Some(b)), now));
    }

    #[test]
    fn test_per_client_key_ignores_port() {
        let limiter = limiter(1.0, 1, true, LimiterScope::PerClient);
        let a1: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let a2: SocketAddr = "10.0.0.1:6000".parse().unwrap();
        assert_eq!(limiter.key_for(Some(a1)), limiter.key_for(Some(a2)));
        assert_eq!(limiter.key_for(None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_global_scope_shares_one_bucket() {
        let limiter = limiter(1.0, 1, true, LimiterScope::Global);
        let a: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let b: SocketAddr = "10.0.0.2:5000".parse().unwrap();
        let now = Instant::now();

        assert!(limiter.check_at(&limiter.key_for(Some(a)), now));
        assert!(!limiter.check_at(&limiter.key_for(Some(b)), now));
    }

    #[test]
    fn test_evicts_idle_buckets() {
        let limiter = limiter(1.0, 1, true, LimiterScope::PerClient);
        let start = Instant::now();

        assert!(limiter.check_at("old", start));
        assert!(limiter.check_at("fresh", start + Duration::from_secs(170)));
        assert_eq!(limiter.tracked_keys(), 2);

        assert_eq!(limiter.evict_idle_at(start + Duration::from_secs(181)), 1);
        assert_eq!(limiter.tracked_keys(), 1);

        // A returning client starts with a full bucket.
        assert!(limiter.check_at("old", start + Duration::from_secs(181)));
    }

    #[test]
    fn test_eviction_keeps_buckets_that_are_still_refilling() {
        let limiter = RateLimiter::new(&config(0.01, 10, 180));
        let start = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at("slow", start));
        }

        // 181s at 0.01 rps refills 1.81 tokens, well short of the burst.
        let later = start + Duration::from_secs(181);
        assert_eq!(limiter.evict_idle_at(later), 0);
        assert_eq!(limiter.tracked_keys(), 1);

        let admitted = (0..10).filter(|_| limiter.check_at("slow", later)).count();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_eviction_waits_for_full_refill() {
        let limiter = RateLimiter::new(&config(0.01, 10, 180));
        let start = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check_at("slow", start));
        }

        assert_eq!(limiter.evict_idle_at(start + Duration::from_secs(999)), 0);
        assert_eq!(limiter.evict_idle_at(start + Duration::from_secs(1001)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_idle_buckets() {
        let limiter = Arc::new(RateLimiter::new(&config(1.0, 1, 5)));
        assert!(limiter.check("idle"));
        assert_eq!(limiter.tracked_keys(), 1);

        let sweeper = tokio::spawn(run_sweeper(limiter.clone(), Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(limiter.tracked_keys(), 0);

        sweeper.abort();
        assert!(sweeper.await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_leaves_active_buckets() {
        let limiter = Arc::new(RateLimiter::new(&config(0.01, 10, 5)));
        for _ in 0..10 {
            assert!(limiter.check("busy"));
        }

        let sweeper = tokio::spawn(run_sweeper(limiter.clone(), Duration::from_secs(10)));
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(!limiter.check("busy"));
        sweeper.abort();
    }

    #[test]
    fn test_concurrent_requests_never_overdraw() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let limiter = Arc::new(limiter(0.001, 50, true, LimiterScope::Global));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if limiter.check(GLOBAL_KEY) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // Refill at 0.001 rps adds nothing meaningful during the test.
        assert_eq!(admitted.load(Ordering::SeqCst), 50);
    }
}
