//! Key/TTL store consulted and populated by the jobs orchestrator.
//!
//! Values are opaque strings (JSON in practice). [`CacheStoreExt`] adds typed
//! JSON helpers on top of any backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Backend unreachable or command rejected
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Stored value could not be encoded or decoded
    #[error("cache serialization error for {key}: {message}")]
    Serialization { key: String, message: String },
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`. Returns whether it existed.
    async fn del(&self, key: &str) -> CacheResult<bool>;

    /// Keys matching a glob `pattern` such as `jobs:*`.
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Round trip to the backend, used by health checks.
    async fn ping(&self) -> CacheResult<()>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// JSON convenience methods for every [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    async fn get_json<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Serialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set(key, raw, ttl).await
    }
}

impl<C: CacheStore + ?Sized> CacheStoreExt for C {}

/// Glob match supporting `*` (any run) and `?` (one character), as Redis `KEYS` does.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, k));
                p += 1;
            }
            Some('?') => {
                p += 1;
                k += 1;
            }
            Some(c) if *c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match star {
                Some((star_p, star_k)) => {
                    p = star_p + 1;
                    k = star_k + 1;
                    star = Some((star_p, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_like_redis_keys() {
        assert!(glob_match("jobs:*", "jobs:tech"));
        assert!(glob_match("jobs:*", "jobs:company:KAKAO"));
        assert!(glob_match("jobs:*", "jobs:"));
        assert!(!glob_match("jobs:*", "notices:all"));
        assert!(glob_match("jobs:company:????", "jobs:company:LINE"));
        assert!(!glob_match("jobs:company:????", "jobs:company:NAVER"));
        assert!(glob_match("*:last-update", "jobs:last-update"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("jobs", "jobs:tech"));
    }
}
