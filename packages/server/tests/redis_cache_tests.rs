//! Redis cache backend against a real server started with testcontainers.
//!
//! Needs a Docker daemon: `cargo test -- --ignored`.

use std::time::Duration;

use anyhow::{Context, Result};
use server_core::kernel::{CacheStore, CacheStoreExt, RedisCache};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::redis::Redis;

/// Keeps the container alive for as long as the cache is used.
struct RedisFixture {
    cache: RedisCache,
    _redis: ContainerAsync<Redis>,
}

async fn start_redis() -> Result<RedisFixture> {
    let redis = Redis::default()
        .start()
        .await
        .context("Failed to start Redis container")?;

    let host = redis.get_host().await?;
    let port = redis.get_host_port_ipv4(6379).await?;
    let cache = RedisCache::connect(&format!("redis://{}:{}", host, port))
        .await
        .context("Failed to connect to Redis container")?;

    Ok(RedisFixture {
        cache,
        _redis: redis,
    })
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_round_trip_and_pattern_delete() {
    let fixture = start_redis().await.unwrap();
    let cache = &fixture.cache;
    let ttl = Duration::from_secs(60);

    cache.ping().await.unwrap();
    cache.set_json("jobs:company:LINE", &vec!["a", "b"], ttl).await.unwrap();
    cache.set("jobs:last-update", "2024-03-15T09:00:00+00:00".into(), ttl).await.unwrap();
    cache.set("notices:all", "[]".into(), ttl).await.unwrap();

    let stored: Option<Vec<String>> = cache.get_json("jobs:company:LINE").await.unwrap();
    assert_eq!(stored, Some(vec!["a".to_string(), "b".to_string()]));

    let mut keys = cache.keys("jobs:*").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["jobs:company:LINE", "jobs:last-update"]);

    assert!(cache.del("jobs:company:LINE").await.unwrap());
    assert!(!cache.del("jobs:company:LINE").await.unwrap());
    assert_eq!(cache.get("jobs:company:LINE").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_entries_expire() {
    let fixture = start_redis().await.unwrap();
    let cache = &fixture.cache;

    cache.set("jobs:tech", "[]".into(), Duration::from_secs(1)).await.unwrap();
    assert!(cache.get("jobs:tech").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(cache.get("jobs:tech").await.unwrap(), None);
}
