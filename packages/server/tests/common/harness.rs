//! Test harness wiring the orchestrator and router to an in-memory cache.
//!
//! No network or browser is involved: every source is a [`MockCrawler`], so
//! tests can count upstream calls and script failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use job_crawlers::testing::MockCrawler;
use job_crawlers::{Company, CrawlerRegistry, JobCrawler, RetryPolicy};
use server_core::domains::jobs::JobsService;
use server_core::kernel::{MemoryCache, ServerDeps};
use server_core::server::build_app;

pub const API_PREFIX: &str = "/api/v1";
pub const MAX_ATTEMPTS: u32 = 3;

pub struct TestHarness {
    pub cache: Arc<MemoryCache>,
    pub jobs: JobsService,
    crawlers: HashMap<Company, Arc<MockCrawler>>,
}

impl TestHarness {
    /// Register `crawlers` in order behind a fresh in-memory cache.
    pub fn new(crawlers: Vec<Arc<MockCrawler>>) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let cache = Arc::new(MemoryCache::new());
        let mut registry = CrawlerRegistry::new();
        let mut by_company = HashMap::new();
        for crawler in crawlers {
            registry.register(crawler.clone());
            by_company.insert(crawler.company(), crawler);
        }

        let jobs = JobsService::new(
            cache.clone(),
            registry,
            RetryPolicy::immediate(MAX_ATTEMPTS),
            Duration::from_secs(3600),
        );

        Self {
            cache,
            jobs,
            crawlers: by_company,
        }
    }

    pub fn crawler(&self, company: Company) -> &Arc<MockCrawler> {
        &self.crawlers[&company]
    }

    /// Upstream calls made so far across every crawler.
    pub fn total_calls(&self) -> usize {
        self.crawlers.values().map(|c| c.calls()).sum()
    }

    /// Router over the same service and cache, mounted at [`API_PREFIX`].
    pub fn app(&self) -> Router {
        let deps = ServerDeps::new(self.cache.clone(), self.jobs.clone(), None);
        build_app(deps, API_PREFIX, &[])
    }
}
