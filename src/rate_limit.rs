use async_trait::async_trait;
use axum::http::HeaderMap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics::RATE_LIMIT_ENTRIES;

// Bucket shared by every client whose address can't be derived
pub const UNKNOWN_IDENTITY: &str = "unknown";

// Rate limit entry - tracks requests per identity
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: Instant,
}

// Policy for one check: at most max_requests per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    // Downloads are more lenient than form posts
    pub fn download() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

// Counter storage, handlers only see this trait
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    // counts one request, true when over the limit
    async fn is_rate_limited(&self, identity: &str, config: RateLimitConfig) -> bool;

    // returns how many expired entries were dropped
    async fn sweep_expired(&self) -> usize;

    fn tracked_identities(&self) -> usize;
}

// Process-local store, expired entries stay until reused or swept
#[derive(Default)]
pub struct InMemoryRateLimiter {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    // check-and-increment runs under the per-key entry lock
    pub fn check_at(&self, identity: &str, config: RateLimitConfig, now: Instant) -> bool {
        let mut entry = self
            .entries
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_reset_at: window_end(now, config.window),
            });

        // window expired..? start a fresh one
        if now > entry.window_reset_at {
            entry.count = 0;
            entry.window_reset_at = window_end(now, config.window);
        }

        entry.count = entry.count.saturating_add(1);
        entry.count > config.max_requests
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.window_reset_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn count_for(&self, identity: &str) -> Option<u32> {
        self.entries.get(identity).map(|entry| entry.count)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimiter {
    async fn is_rate_limited(&self, identity: &str, config: RateLimitConfig) -> bool {
        let limited = self.check_at(identity, config, Instant::now());
        // the entry guard is released by now, len() would deadlock otherwise
        RATE_LIMIT_ENTRIES.set(self.entries.len() as f64);
        limited
    }

    async fn sweep_expired(&self) -> usize {
        let removed = self.sweep_at(Instant::now());
        RATE_LIMIT_ENTRIES.set(self.entries.len() as f64);
        removed
    }

    fn tracked_identities(&self) -> usize {
        self.entries.len()
    }
}

// Largest reset time that fits, an oversized window just never expires
fn window_end(now: Instant, window: Duration) -> Instant {
    let mut window = window;
    loop {
        if let Some(end) = now.checked_add(window) {
            return end;
        }
        window /= 2;
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

// First hop of x-forwarded-for, then x-real-ip, then the shared bucket.
// Empty headers count as missing. Addresses are taken as-is.
pub fn client_identity(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        let first = forwarded.split(',').next().map(str::trim).unwrap_or_default();

        if first.is_empty() {
            return UNKNOWN_IDENTITY.to_string();
        }
        return first.to_string();
    }

    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return real_ip.to_string();
    }

    UNKNOWN_IDENTITY.to_string()
}

// Background sweep - keeps memory bounded by active identities
pub async fn sweeper(store: Arc<dyn RateLimitStore>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);

    info!(interval = ?sweep_interval, "rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = store.sweep_expired().await;
        if removed > 0 {
            debug!(
                removed,
                remaining = store.tracked_identities(),
                "swept expired rate limit entries"
            );
        }
    }
}
