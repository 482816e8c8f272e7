//! Testing utilities including a mock crawler.
//!
//! Useful for exercising the orchestrator without network or browser access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult};
use crate::traits::JobCrawler;
use crate::types::{Company, JobPosting, JobQuery, Location};

/// A complete, valid posting for `company` with the given id and title.
pub fn sample_posting(company: Company, id: &str, title: &str, now: DateTime<Utc>) -> JobPosting {
    let mut posting = JobPosting::template(company, now);
    posting.id = id.to_string();
    posting.title = title.to_string();
    posting.department = "Engineering".to_string();
    posting.field = "Backend".to_string();
    posting.locations = vec![Location::Seoul];
    posting.url = format!("https://careers.example.com/{}/{}", company.code().to_lowercase(), id);
    posting.source.original_id = id.to_string();
    posting.source.original_url = posting.url.clone();
    posting
}

/// A mock crawler for testing.
///
/// Returns predefined postings and can be told to fail a number of times
/// before succeeding.
pub struct MockCrawler {
    company: Company,
    postings: Arc<RwLock<Vec<JobPosting>>>,
    /// Remaining calls that fail; `usize::MAX` fails forever.
    failures_left: AtomicUsize,
    /// Fail with a parse error instead of a transient one.
    broken_markup: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCrawler {
    pub fn new(company: Company) -> Self {
        Self {
            company,
            postings: Arc::new(RwLock::new(Vec::new())),
            failures_left: AtomicUsize::new(0),
            broken_markup: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Postings returned by every successful call.
    pub fn with_postings(self, postings: Vec<JobPosting>) -> Self {
        *self.write_postings() = postings;
        self
    }

    /// Fail the next `times` calls with a transient error.
    pub fn failing_times(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    /// Fail every call.
    pub fn always_failing(self) -> Self {
        self.failing_times(usize::MAX)
    }

    /// Fail every call with a parse error, as after an upstream redesign.
    pub fn with_broken_markup(mut self) -> Self {
        self.broken_markup = true;
        self.always_failing()
    }

    /// Sleep before answering, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the postings returned from now on.
    pub fn set_postings(&self, postings: Vec<JobPosting>) {
        *self.write_postings() = postings;
    }

    /// Number of `fetch_jobs` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn read_postings(&self) -> RwLockReadGuard<'_, Vec<JobPosting>> {
        self.postings.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_postings(&self) -> RwLockWriteGuard<'_, Vec<JobPosting>> {
        self.postings.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[async_trait]
impl JobCrawler for MockCrawler {
    fn company(&self) -> Company {
        self.company
    }

    fn base_url(&self) -> &str {
        "https://careers.example.com"
    }

    async fn fetch_jobs(&self, _query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure() {
            if self.broken_markup {
                return Err(CrawlError::Parse("listing container not found".into()));
            }
            return Err(CrawlError::Status {
                url: self.base_url().to_string(),
                status: 503,
            });
        }

        Ok(self.read_postings().clone())
    }
}
