use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval};

use crate::config::RateLimitSettings;

// Rate limit entry - tracks requests per client
#[derive(Debug, Clone, Copy)]
pub struct RateLimitWindow {
    pub count: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub limit: u32,
    pub window: Duration,
    pub retry_after: Duration,
}

pub struct RateLimiter {
    windows: DashMap<String, RateLimitWindow>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Option<Self> {
        settings
            .enabled
            .then(|| Self::new(settings.limit, settings.window))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn allow(&self, identity: &str) -> bool {
        self.check(identity).is_ok()
    }

    // entry() holds the shard lock, so read-and-increment is atomic per identity
    pub fn check(&self, identity: &str) -> Result<(), Rejection> {
        if self.limit == 0 {
            return Err(Rejection {
                limit: 0,
                window: self.window,
                retry_after: self.window,
            });
        }

        let now = Instant::now();

        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert(RateLimitWindow {
                count: 0,
                window_start: now,
            });

        // window expired..? start a new one
        if now.duration_since(entry.window_start) > self.window {
            entry.count = 1;
            entry.window_start = now;
            return Ok(());
        }

        if entry.count < self.limit {
            entry.count += 1;
            return Ok(());
        }

        let elapsed = now.duration_since(entry.window_start);
        Err(Rejection {
            limit: self.limit,
            window: self.window,
            retry_after: self.window.saturating_sub(elapsed),
        })
    }

    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.window_start) <= self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }
}

// Periodic cleanup so idle clients don't pin memory
pub async fn sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = interval(every);
    tracing::debug!(interval = ?every, "rate limit sweeper started");

    loop {
        interval.tick().await;
        let removed = limiter.sweep();
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = limiter.tracked_identities(),
                "swept expired rate limit windows"
            );
        }
    }
}
