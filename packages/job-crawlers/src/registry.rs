//! Lookup of crawlers by company.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::browser::BrowserService;
use crate::crawlers::{
    BaeminCrawler, CoupangCrawler, DanggnCrawler, KakaoCrawler, LineCrawler, NaverCrawler,
    TossCrawler,
};
use crate::http::HttpFetcher;
use crate::traits::JobCrawler;
use crate::types::Company;

/// Shared resources the built-in crawlers are constructed from.
#[derive(Clone)]
pub struct CrawlerDeps {
    pub http: Arc<HttpFetcher>,
    /// Render service for script-rendered sites. Those crawlers are skipped without it.
    pub browser: Option<Arc<BrowserService>>,
    pub max_pages: usize,
}

/// Crawlers keyed by company, in registration order.
#[derive(Default, Clone)]
pub struct CrawlerRegistry {
    crawlers: IndexMap<Company, Arc<dyn JobCrawler>>,
}

impl CrawlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in crawler the given dependencies can support.
    pub fn with_default_crawlers(deps: CrawlerDeps) -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(NaverCrawler::new(deps.http.clone())))
            .register(Arc::new(KakaoCrawler::new(deps.http.clone(), deps.max_pages)))
            .register(Arc::new(LineCrawler::new(deps.http.clone())))
            .register(Arc::new(CoupangCrawler::new(deps.http.clone(), deps.max_pages)))
            .register(Arc::new(DanggnCrawler::new(deps.http.clone())));

        match deps.browser {
            Some(browser) => {
                registry
                    .register(Arc::new(BaeminCrawler::new(browser.clone())))
                    .register(Arc::new(TossCrawler::new(browser)));
            }
            None => warn!("No headless browser; skipping script-rendered sources"),
        }

        info!(companies = ?registry.companies(), "Crawler registry ready");
        registry
    }

    /// Add a crawler, replacing any previous one for the same company.
    pub fn register(&mut self, crawler: Arc<dyn JobCrawler>) -> &mut Self {
        self.crawlers.insert(crawler.company(), crawler);
        self
    }

    pub fn get(&self, company: Company) -> Option<Arc<dyn JobCrawler>> {
        self.crawlers.get(&company).cloned()
    }

    pub fn contains(&self, company: Company) -> bool {
        self.crawlers.contains_key(&company)
    }

    pub fn companies(&self) -> Vec<Company> {
        self.crawlers.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Company, Arc<dyn JobCrawler>)> + '_ {
        self.crawlers.iter().map(|(company, crawler)| (*company, crawler.clone()))
    }

    pub fn len(&self) -> usize {
        self.crawlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawlers.is_empty()
    }
}
