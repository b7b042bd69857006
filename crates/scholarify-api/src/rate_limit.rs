use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// In-memory token buckets keyed by client address.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    /// Allows `capacity` requests per `period`, refilling continuously.
    pub fn new(capacity: u32, period: Duration) -> Self {
        let capacity = f64::from(capacity);
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_per_sec: capacity / period.as_secs_f64(),
        }
    }

    pub async fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut lock = self.buckets.lock().await;
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drops buckets untouched for `idle`. Returns how many were removed.
    pub async fn prune_idle(&self, idle: Duration) -> usize {
        self.prune_idle_at(idle, Instant::now()).await
    }

    async fn prune_idle_at(&self, idle: Duration, now: Instant) -> usize {
        let mut lock = self.buckets.lock().await;
        let before = lock.len();
        lock.retain(|_, b| now.saturating_duration_since(b.last_refill) < idle);
        before - lock.len()
    }
}

/// Client IP from the connection, or `"unknown"` when the server was started
/// without connect info.
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_empties_then_refills() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.allow_at("1.2.3.4", start).await);
        }
        assert!(!limiter.allow_at("1.2.3.4", start).await);
        // Other clients have their own bucket.
        assert!(limiter.allow_at("5.6.7.8", start).await);

        // One token comes back every 12 seconds.
        assert!(limiter.allow_at("1.2.3.4", start + Duration::from_secs(12)).await);
        assert!(!limiter.allow_at("1.2.3.4", start + Duration::from_secs(12)).await);
    }

    #[tokio::test]
    async fn prune_drops_only_idle_buckets() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();
        limiter.allow_at("old", start).await;
        limiter.allow_at("fresh", start + Duration::from_secs(300)).await;

        let removed = limiter
            .prune_idle_at(Duration::from_secs(120), start + Duration::from_secs(301))
            .await;
        assert_eq!(removed, 1);
        assert_eq!(limiter.buckets.lock().await.len(), 1);
    }
}
