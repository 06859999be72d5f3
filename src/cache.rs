//! Cache session abstraction for PKCE verifier state.
//!
//! Verifiers are written during login initiation keyed by the OAuth2 `state`
//! parameter and read back during the callback exchange. The backend is
//! injected; production deployments typically use a distributed store, tests
//! use [`InMemoryCacheSession`].

use crate::error::ExchangeResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key-value session with per-entry expiry.
#[async_trait]
pub trait CacheSession: Send + Sync {
    /// Look up a value. Expired entries read as absent.
    async fn get(&self, key: &str) -> ExchangeResult<Option<String>>;

    /// Store a value with a time-to-live.
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> ExchangeResult<()>;

    /// Remove a value. Returns whether an entry was present.
    async fn delete(&self, key: &str) -> ExchangeResult<bool>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-memory implementation of [`CacheSession`].
///
/// Entries are expired lazily on read; [`cleanup_expired`](Self::cleanup_expired)
/// sweeps the rest.
pub struct InMemoryCacheSession {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCacheSession {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Remove all expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            entries.remove(&key);
        }

        count
    }
}

impl Default for InMemoryCacheSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheSession for InMemoryCacheSession {
    async fn get(&self, key: &str) -> ExchangeResult<Option<String>> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> ExchangeResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds as i64),
        };

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ExchangeResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = InMemoryCacheSession::new();

        cache
            .set("state1", "verifier123".to_string(), 300)
            .await
            .unwrap();

        let value = cache.get("state1").await.unwrap();
        assert_eq!(value, Some("verifier123".to_string()));

        // First delete removes, second sees absence
        assert!(cache.delete("state1").await.unwrap());
        assert!(!cache.delete("state1").await.unwrap());

        assert_eq!(cache.get("state1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let cache = InMemoryCacheSession::new();

        // Insert an already-expired entry directly
        {
            let mut entries = cache.entries.write().await;
            entries.insert(
                "stale".to_string(),
                CacheEntry {
                    value: "old_verifier".to_string(),
                    expires_at: Utc::now() - Duration::minutes(1),
                },
            );
        }

        assert_eq!(cache.get("stale").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let cache = InMemoryCacheSession::new();

        cache.set("live", "v1".to_string(), 300).await.unwrap();
        {
            let mut entries = cache.entries.write().await;
            entries.insert(
                "dead".to_string(),
                CacheEntry {
                    value: "v2".to_string(),
                    expires_at: Utc::now() - Duration::minutes(1),
                },
            );
        }

        let cleaned = cache.cleanup_expired().await;
        assert_eq!(cleaned, 1);

        assert_eq!(cache.get("live").await.unwrap(), Some("v1".to_string()));
        assert_eq!(cache.get("dead").await.unwrap(), None);
    }
}
