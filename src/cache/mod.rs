// Cache-aside store. Uninitialized -> Connecting -> Connected | Disabled,
// then Closed on disconnect. Backend failures read as a miss.

mod backend;
mod key;

pub use backend::{CacheBackend, MemoryBackend, RedisBackend};
pub use key::{KEY_NAMESPACE, fingerprint, request_fingerprint};
pub(crate) use key::format_float;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::CacheSettings;
use crate::error::CacheError;
use crate::models::CacheEntry;

const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Uninitialized,
    Connecting,
    Connected,
    Disabled,
    Closed,
}

enum CacheState {
    Uninitialized,
    Connecting,
    Connected(Arc<dyn CacheBackend>),
    Disabled,
    Closed,
}

impl CacheState {
    fn status(&self) -> CacheStatus {
        match self {
            CacheState::Uninitialized => CacheStatus::Uninitialized,
            CacheState::Connecting => CacheStatus::Connecting,
            CacheState::Connected(_) => CacheStatus::Connected,
            CacheState::Disabled => CacheStatus::Disabled,
            CacheState::Closed => CacheStatus::Closed,
        }
    }
}

pub struct CacheStore {
    settings: CacheSettings,
    state: RwLock<CacheState>,
}

impl CacheStore {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(CacheState::Uninitialized),
        }
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        let settings = CacheSettings {
            url: format!("{}://", backend.name()),
            ttl,
            connect_attempts: 1,
            retry_delay: Duration::ZERO,
            connect_timeout: Duration::from_secs(5),
        };
        Self {
            settings,
            state: RwLock::new(CacheState::Connected(backend)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.settings.ttl
    }

    pub async fn status(&self) -> CacheStatus {
        self.state.read().await.status()
    }

    // Bounded retries. Ends Connected or Disabled, never fails; no-op once started.
    pub async fn connect(&self) -> CacheStatus {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, CacheState::Uninitialized) {
                return state.status();
            }
            *state = CacheState::Connecting;
        }

        let attempts = self.settings.connect_attempts.max(1);
        let mut next = CacheState::Disabled;
        for attempt in 1..=attempts {
            match self.open_backend().await {
                Ok(backend) => {
                    tracing::info!(
                        url = %self.settings.url,
                        backend = backend.name(),
                        "connected to cache"
                    );
                    next = CacheState::Connected(backend);
                    break;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "cache connect failed, retrying in {:?}",
                        self.settings.retry_delay
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    tracing::warn!(
                        attempts,
                        error = %e,
                        "cache connect failed, caching disabled"
                    );
                }
            }
        }

        let mut state = self.state.write().await;
        // disconnect() may have run while we were retrying
        if matches!(*state, CacheState::Connecting) {
            *state = next;
        }
        state.status()
    }

    async fn open_backend(&self) -> Result<Arc<dyn CacheBackend>, CacheError> {
        let url = self.settings.url.as_str();
        let backend: Arc<dyn CacheBackend> = if url.starts_with(MEMORY_SCHEME) {
            Arc::new(MemoryBackend::new())
        } else if url.starts_with("redis://") || url.starts_with("rediss://") {
            Arc::new(RedisBackend::connect(url, self.settings.connect_timeout).await?)
        } else {
            return Err(CacheError::UnsupportedUrl(url.to_string()));
        };

        tokio::time::timeout(self.settings.connect_timeout, backend.ping())
            .await
            .map_err(|_| CacheError::Timeout(self.settings.connect_timeout))??;
        Ok(backend)
    }

    async fn backend(&self) -> Option<Arc<dyn CacheBackend>> {
        match &*self.state.read().await {
            CacheState::Connected(backend) => Some(Arc::clone(backend)),
            _ => None,
        }
    }

    // None on miss, disabled store or backend error
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let backend = self.backend().await?;

        let raw = match backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = short_key(key), "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = short_key(key), error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => {
                tracing::debug!(key = short_key(key), "cache hit");
                Some(entry)
            }
            Err(e) => {
                tracing::warn!(
                    key = short_key(key),
                    error = %CacheError::from(e),
                    "discarding unreadable cache entry"
                );
                None
            }
        }
    }

    pub async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) {
        let Some(backend) = self.backend().await else {
            return;
        };

        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = short_key(key), error = %CacheError::from(e), "cache write skipped");
                return;
            }
        };

        match backend.set_ex(key, &value, ttl).await {
            Ok(()) => tracing::debug!(key = short_key(key), ttl_secs = ttl.as_secs(), "cached result"),
            Err(e) => tracing::warn!(key = short_key(key), error = %e, "cache write failed"),
        }
    }

    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if matches!(*state, CacheState::Closed) {
            return;
        }
        if matches!(*state, CacheState::Connected(_)) {
            tracing::info!(url = %self.settings.url, "disconnected from cache");
        }
        *state = CacheState::Closed;
    }

    pub async fn purge_expired(&self) -> usize {
        match self.backend().await {
            Some(backend) => backend.purge_expired(),
            None => 0,
        }
    }
}

// Periodic eviction for the in-process backend
pub async fn janitor(store: Arc<CacheStore>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let removed = store.purge_expired().await;
        if removed > 0 {
            tracing::debug!(removed, "purged expired cache entries");
        }
    }
}

// Enough of the digest to correlate log lines
fn short_key(key: &str) -> &str {
    let end = key
        .char_indices()
        .nth(20)
        .map(|(i, _)| i)
        .unwrap_or(key.len());
    &key[..end]
}
