//! In-process cache used when no Redis URL is configured, and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::cache::{glob_match, CacheError, CacheResult, CacheStore};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL-aware map. Expired entries are treated as absent and swept on write.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    /// When set, every call fails with a backend error.
    unavailable: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, to simulate a backend outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::Backend("memory cache marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .await
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.check_available()?;
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(key, e)| e.is_live(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_available()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::cache::CacheStoreExt;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        assert_ok!(cache.set("jobs:tech", "[]".into(), Duration::from_secs(60)).await);
        assert_eq!(cache.get("jobs:tech").await.unwrap().as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("jobs:tech").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("jobs:tech").await.unwrap(), None);
        assert!(cache.keys("jobs:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_and_del_follow_pattern() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        for key in ["jobs:tech", "jobs:company:KAKAO", "notices:all"] {
            cache.set(key, "1".into(), ttl).await.unwrap();
        }

        assert_eq!(
            cache.keys("jobs:*").await.unwrap(),
            vec!["jobs:company:KAKAO".to_string(), "jobs:tech".to_string()]
        );
        assert!(cache.del("jobs:tech").await.unwrap());
        assert!(!cache.del("jobs:tech").await.unwrap());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn json_helpers_round_trip_and_report_bad_payloads() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set_json("numbers", &vec![1, 2, 3], ttl).await.unwrap();
        let numbers: Option<Vec<u32>> = cache.get_json("numbers").await.unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        cache.set("broken", "{not json".into(), ttl).await.unwrap();
        let err = cache.get_json::<Vec<u32>>("broken").await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization { ref key, .. } if key == "broken"));
    }

    #[tokio::test]
    async fn unavailable_backend_fails_every_call() {
        let cache = MemoryCache::new();
        cache.set_unavailable(true);
        assert_err!(cache.ping().await);
        assert_err!(cache.get("jobs:tech").await);
        cache.set_unavailable(false);
        assert_ok!(cache.ping().await);
    }
}
