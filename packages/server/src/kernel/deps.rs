//! Server dependencies shared by the scheduler and the HTTP layer.
//!
//! Built once at startup from [`Config`]; tests assemble one directly from a
//! [`MemoryCache`] and mock crawlers through [`ServerDeps::new`].

use std::sync::Arc;

use anyhow::{Context, Result};
use job_crawlers::{BrowserService, CrawlerDeps, CrawlerRegistry, HttpFetcher};

use crate::config::Config;
use crate::domains::jobs::JobsService;
use crate::kernel::{CacheStore, MemoryCache, RedisCache};

#[derive(Clone)]
pub struct ServerDeps {
    pub cache: Arc<dyn CacheStore>,
    pub jobs: JobsService,
    /// Headless render service, when enabled. Closed once on shutdown.
    pub browser: Option<Arc<BrowserService>>,
}

impl ServerDeps {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        jobs: JobsService,
        browser: Option<Arc<BrowserService>>,
    ) -> Self {
        Self {
            cache,
            jobs,
            browser,
        }
    }

    /// Connect the cache backend and build every crawler from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache: Arc<dyn CacheStore> = match &config.redis_url {
            Some(url) => {
                tracing::info!("Connecting to Redis...");
                let redis = RedisCache::connect(url)
                    .await
                    .context("Failed to connect to Redis")?;
                tracing::info!("Redis connected");
                Arc::new(redis)
            }
            None => {
                tracing::warn!("REDIS_URL not set; using in-memory cache");
                Arc::new(MemoryCache::new())
            }
        };

        let http = Arc::new(
            HttpFetcher::new(config.crawl.http_config())
                .context("Failed to build HTTP client")?,
        );

        let browser = config
            .browser
            .enabled
            .then(|| Arc::new(BrowserService::new(config.browser.render_config())));

        let registry = CrawlerRegistry::with_default_crawlers(CrawlerDeps {
            http,
            browser: browser.clone(),
            max_pages: config.crawl.max_pages,
        });

        let jobs = JobsService::new(
            cache.clone(),
            registry,
            config.crawl.retry_policy(),
            config.jobs.cache_ttl,
        );

        Ok(Self::new(cache, jobs, browser))
    }

    /// Release external resources. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.shutdown().await;
        }
    }
}
