//! Jobs orchestrator.
//!
//! Refreshes every registered source (on a schedule and at startup), writes
//! per-company and aggregate cache entries, and serves cache-aside reads with
//! in-memory filtering and pagination.
//!
//! ```text
//! scheduler / read miss
//!     │
//!     └─► ensure_fresh(company)        one in-flight refresh per company
//!             ├─► retry_with_backoff_if(crawler.fetch_jobs, transient errors only)
//!             ├─► set jobs:company:{CODE}
//!             └─► merge into jobs:all   (replace that company's slice)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use job_crawlers::traits::retain_valid;
use job_crawlers::{
    retry_with_backoff_if, Company, CrawlError, CrawlerRegistry, JobCrawler, JobPosting, JobQuery,
    RetryPolicy, UnknownCompany,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::cache_keys::{
    company_key, tech_query_key, ALL_JOBS, LAST_UPDATE, NAMESPACE_PATTERN,
};
use super::error::{JobsError, JobsResult};
use super::filter::{respond, PaginatedResponse};
use crate::kernel::{CacheStore, CacheStoreExt, SingleFlight};

/// Lifetime of the last-update marker, independent of the posting TTL.
pub const LAST_UPDATE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One entry of the supported-source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyInfo {
    pub code: Company,
    pub name: &'static str,
}

impl From<Company> for CompanyInfo {
    fn from(company: Company) -> Self {
        Self {
            code: company,
            name: company.display_name(),
        }
    }
}

/// Outcome of [`JobsService::refresh_all`], per company.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// Companies refreshed, with the number of postings cached.
    pub succeeded: Vec<(Company, usize)>,
    pub failed: Vec<(Company, String)>,
}

impl RefreshReport {
    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn total_postings(&self) -> usize {
        self.succeeded.iter().map(|(_, count)| count).sum()
    }
}

struct Inner {
    cache: Arc<dyn CacheStore>,
    registry: CrawlerRegistry,
    retry: RetryPolicy,
    ttl: Duration,
    flights: SingleFlight<Company, JobsResult<Vec<JobPosting>>>,
    /// Serializes read-modify-write of the aggregate within this process.
    aggregate: Mutex<()>,
}

/// Cheap to clone; clones share caches, crawlers and in-flight refreshes.
#[derive(Clone)]
pub struct JobsService {
    inner: Arc<Inner>,
}

impl JobsService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        registry: CrawlerRegistry,
        retry: RetryPolicy,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                registry,
                retry,
                ttl,
                flights: SingleFlight::new(),
                aggregate: Mutex::new(()),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.inner.cache
    }

    pub fn registry(&self) -> &CrawlerRegistry {
        &self.inner.registry
    }

    /// Crawl `company` and write its cache entries, joining a refresh that is
    /// already in flight for the same company instead of starting another.
    pub async fn ensure_fresh(&self, company: Company) -> JobsResult<Vec<JobPosting>> {
        let crawler = self
            .inner
            .registry
            .get(company)
            .ok_or_else(|| JobsError::UnknownCompany(company.code().to_string()))?;

        let inner = Arc::clone(&self.inner);
        self.inner
            .flights
            .run(company, move || async move {
                inner.refresh_company(company, crawler).await
            })
            .await?
    }

    /// Refresh every registered source concurrently. A failing source never
    /// cancels its siblings and leaves its previous cache entry untouched.
    pub async fn refresh_all(&self) -> RefreshReport {
        let started_at = Utc::now();
        info!(sources = self.inner.registry.len(), "Refreshing job postings");

        let mut report = RefreshReport::default();
        for (company, outcome) in self.fan_out().await {
            match outcome {
                Ok(postings) => report.succeeded.push((company, postings.len())),
                Err(e) => {
                    error!(company = %company, error = %e, "Source refresh failed");
                    report.failed.push((company, e.to_string()));
                }
            }
        }

        if report.any_succeeded() {
            if let Err(e) = self
                .inner
                .cache
                .set(LAST_UPDATE, started_at.to_rfc3339(), LAST_UPDATE_TTL)
                .await
            {
                warn!(error = %e, "Failed to record last update time");
            }
        } else {
            warn!("No source refreshed; last update time unchanged");
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            postings = report.total_postings(),
            "Job refresh finished"
        );
        report
    }

    /// Postings across every source, filtered and paginated.
    pub async fn get_tech_jobs(&self, query: JobQuery) -> JobsResult<PaginatedResponse<JobPosting>> {
        let query = query.normalized();
        let key = tech_query_key(&query);

        if let Some(cached) = self.inner.cache.get_json::<Vec<JobPosting>>(&key).await? {
            debug!(key = %key, "Cache hit");
            return Ok(respond(cached, &query));
        }
        debug!(key = %key, "Cache miss");

        let aggregate = if key == ALL_JOBS {
            None
        } else {
            self.inner
                .cache
                .get_json::<Vec<JobPosting>>(ALL_JOBS)
                .await?
        };

        let postings = match aggregate {
            Some(postings) => postings,
            None => self.crawl_all().await?,
        };

        // Refreshes already maintain the aggregate key.
        if key != ALL_JOBS {
            self.inner
                .cache
                .set_json(&key, &postings, self.inner.ttl)
                .await?;
        }

        Ok(respond(postings, &query))
    }

    /// Postings for one company, filtered and paginated.
    pub async fn get_company_tech_jobs(
        &self,
        company: &str,
        query: JobQuery,
    ) -> JobsResult<PaginatedResponse<JobPosting>> {
        let company: Company = company
            .parse()
            .map_err(|UnknownCompany(code)| JobsError::UnknownCompany(code))?;
        if !self.inner.registry.contains(company) {
            return Err(JobsError::UnknownCompany(company.code().to_string()));
        }

        let query = query.normalized();
        let key = company_key(company);

        let postings = match self.inner.cache.get_json::<Vec<JobPosting>>(&key).await? {
            Some(cached) => {
                debug!(key = %key, "Cache hit");
                cached
            }
            None => {
                debug!(key = %key, "Cache miss");
                self.ensure_fresh(company).await?
            }
        };

        Ok(respond(postings, &query))
    }

    /// Sources with a registered crawler, in registration order.
    pub fn supported_companies(&self) -> Vec<CompanyInfo> {
        self.inner
            .registry
            .companies()
            .into_iter()
            .map(CompanyInfo::from)
            .collect()
    }

    pub async fn last_updated(&self) -> JobsResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.inner.cache.get(LAST_UPDATE).await? else {
            return Ok(None);
        };

        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring malformed last update time");
                Ok(None)
            }
        }
    }

    /// Delete every `jobs:*` key. Returns how many were removed.
    pub async fn clear_cache(&self) -> JobsResult<usize> {
        let keys = self.inner.cache.keys(NAMESPACE_PATTERN).await?;
        let mut removed = 0;
        for key in &keys {
            if self.inner.cache.del(key).await? {
                removed += 1;
            }
        }
        info!(removed, "Cleared job cache");
        Ok(removed)
    }

    async fn fan_out(&self) -> Vec<(Company, JobsResult<Vec<JobPosting>>)> {
        let companies = self.inner.registry.companies();
        let outcomes = join_all(companies.iter().map(|company| self.ensure_fresh(*company))).await;
        companies.into_iter().zip(outcomes).collect()
    }

    /// Fresh postings from every source; unavailable sources contribute nothing.
    async fn crawl_all(&self) -> JobsResult<Vec<JobPosting>> {
        let outcomes = self.fan_out().await;
        if outcomes.is_empty() {
            return Ok(Vec::new());
        }

        let mut postings = Vec::new();
        let mut succeeded = 0;
        for (company, outcome) in outcomes {
            match outcome {
                Ok(fresh) => {
                    succeeded += 1;
                    postings.extend(fresh);
                }
                Err(e) => warn!(company = %company, error = %e, "Serving without unavailable source"),
            }
        }

        if succeeded == 0 {
            return Err(JobsError::AllSourcesFailed);
        }
        Ok(postings)
    }
}

impl Inner {
    async fn refresh_company(
        &self,
        company: Company,
        crawler: Arc<dyn JobCrawler>,
    ) -> JobsResult<Vec<JobPosting>> {
        info!(company = %company, "Updating jobs");

        let operation = format!("fetch {} jobs", company);
        let fetched = retry_with_backoff_if(
            &self.retry,
            &operation,
            CrawlError::is_transient,
            || crawler.fetch_jobs(None),
        )
            .await
            .map_err(|e| JobsError::Crawl {
                company,
                message: e.to_string(),
            })?;
        let postings = retain_valid(crawler.as_ref(), fetched);

        self.cache
            .set_json(&company_key(company), &postings, self.ttl)
            .await?;
        self.merge_into_aggregate(company, &postings).await?;

        info!(company = %company, count = postings.len(), "Updated jobs");
        Ok(postings)
    }

    /// Replace `company`'s slice of the aggregate, keeping every other source.
    ///
    /// The lock only covers this process; two processes refreshing against one
    /// Redis can still lose an update (last write wins).
    async fn merge_into_aggregate(&self, company: Company, postings: &[JobPosting]) -> JobsResult<()> {
        let _guard = self.aggregate.lock().await;

        let mut all: Vec<JobPosting> = self
            .cache
            .get_json(ALL_JOBS)
            .await?
            .unwrap_or_default();
        all.retain(|posting| posting.company != company);
        all.extend_from_slice(postings);

        self.cache.set_json(ALL_JOBS, &all, self.ttl).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CacheResult, MemoryCache};
    use job_crawlers::testing::{sample_posting, MockCrawler};

    fn service_with(crawlers: Vec<Arc<MockCrawler>>) -> (JobsService, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let mut registry = CrawlerRegistry::new();
        for crawler in crawlers {
            registry.register(crawler);
        }
        let service = JobsService::new(
            cache.clone(),
            registry,
            RetryPolicy::immediate(3),
            Duration::from_secs(3600),
        );
        (service, cache)
    }

    #[tokio::test]
    async fn invalid_postings_never_reach_the_cache() {
        let now = Utc::now();
        let mut broken = sample_posting(Company::Kakao, "2", "Designer", now);
        broken.title.clear();
        let crawler = Arc::new(
            MockCrawler::new(Company::Kakao)
                .with_postings(vec![sample_posting(Company::Kakao, "1", "Server Developer", now), broken]),
        );
        let (service, cache) = service_with(vec![crawler]);

        let fresh = service.ensure_fresh(Company::Kakao).await.unwrap();
        assert_eq!(fresh.len(), 1);

        let cached: Vec<JobPosting> = cache
            .get_json(&company_key(Company::Kakao))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached, fresh);
    }

    /// Memory cache whose aggregate reads stall, so a refresh can be caught
    /// inside the merge.
    struct StallingAggregate {
        inner: MemoryCache,
        stall: Duration,
    }

    #[async_trait::async_trait]
    impl CacheStore for StallingAggregate {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            if key == ALL_JOBS {
                tokio::time::sleep(self.stall).await;
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn del(&self, key: &str) -> CacheResult<bool> {
            self.inner.del(key).await
        }

        async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
            self.inner.keys(pattern).await
        }

        async fn ping(&self) -> CacheResult<()> {
            self.inner.ping().await
        }

        fn backend_name(&self) -> &'static str {
            "stalling"
        }
    }

    fn postings(company: Company, count: usize) -> Vec<JobPosting> {
        let now = Utc::now();
        (1..=count)
            .map(|i| sample_posting(company, &i.to_string(), "Backend Engineer", now))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_read_does_not_block_other_refreshes() {
        let cache = Arc::new(StallingAggregate {
            inner: MemoryCache::new(),
            stall: Duration::from_secs(1),
        });
        let mut registry = CrawlerRegistry::new();
        registry.register(Arc::new(
            MockCrawler::new(Company::Kakao).with_postings(postings(Company::Kakao, 2)),
        ));
        registry.register(Arc::new(
            MockCrawler::new(Company::Naver).with_postings(postings(Company::Naver, 3)),
        ));
        let service = JobsService::new(
            cache.clone(),
            registry,
            RetryPolicy::immediate(3),
            Duration::from_secs(3600),
        );

        // The reader's refresh is parked in the aggregate merge when it goes away
        let reader = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .get_company_tech_jobs("kakao", JobQuery::new())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        reader.abort();

        let naver = tokio::time::timeout(
            Duration::from_secs(30),
            service.ensure_fresh(Company::Naver),
        )
        .await
        .expect("refresh blocked behind an abandoned merge");
        assert_eq!(naver.unwrap().len(), 3);

        let all: Vec<JobPosting> = cache.inner.get_json(ALL_JOBS).await.unwrap().unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(service.inner.flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn unregistered_company_is_unknown() {
        let (service, _) = service_with(vec![Arc::new(MockCrawler::new(Company::Line))]);
        assert!(matches!(
            service.ensure_fresh(Company::Toss).await,
            Err(JobsError::UnknownCompany(_))
        ));
        assert!(matches!(
            service.get_company_tech_jobs("nope", JobQuery::new()).await,
            Err(JobsError::UnknownCompany(_))
        ));
    }

    #[tokio::test]
    async fn last_update_round_trips_and_tolerates_garbage() {
        let (service, cache) = service_with(vec![Arc::new(MockCrawler::new(Company::Line))]);
        assert_eq!(service.last_updated().await.unwrap(), None);

        cache
            .set(LAST_UPDATE, "yesterday".into(), LAST_UPDATE_TTL)
            .await
            .unwrap();
        assert_eq!(service.last_updated().await.unwrap(), None);

        service.refresh_all().await;
        assert!(service.last_updated().await.unwrap().is_some());
    }

    #[test]
    fn catalog_lists_registered_sources_with_names() {
        let (service, _) = service_with(vec![
            Arc::new(MockCrawler::new(Company::Toss)),
            Arc::new(MockCrawler::new(Company::Naver)),
        ]);
        assert_eq!(
            service.supported_companies(),
            vec![
                CompanyInfo {
                    code: Company::Toss,
                    name: "토스"
                },
                CompanyInfo {
                    code: Company::Naver,
                    name: "네이버"
                },
            ]
        );
    }
}
