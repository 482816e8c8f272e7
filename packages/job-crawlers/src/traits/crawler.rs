//! Crawler capability implemented once per upstream careers site.

use async_trait::async_trait;
use tracing::debug;

use crate::error::CrawlResult;
use crate::types::{Company, JobPosting, JobQuery};

/// A bespoke adapter for one company's careers listing.
///
/// Implementations return `Err` for transport failures so the caller can
/// retry them, and `Ok(vec![])` when the listing structure cannot be found.
/// Individual malformed listings are skipped.
#[async_trait]
pub trait JobCrawler: Send + Sync {
    /// Source this crawler produces postings for.
    fn company(&self) -> Company;

    /// Base used by [`job_detail_url`](Self::job_detail_url).
    fn base_url(&self) -> &str;

    /// Fetch and normalize the current listings.
    ///
    /// `query` may narrow upstream requests where the site supports it.
    async fn fetch_jobs(&self, query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>>;

    /// Canonical detail page for an upstream id.
    fn job_detail_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.base_url().trim_end_matches('/'), job_id)
    }

    fn is_valid_posting(&self, posting: &JobPosting) -> bool {
        posting.is_valid()
    }
}

/// Drop postings that fail `crawler.is_valid_posting`, logging what was missing.
pub fn retain_valid<C: JobCrawler + ?Sized>(crawler: &C, postings: Vec<JobPosting>) -> Vec<JobPosting> {
    postings
        .into_iter()
        .filter(|posting| {
            let valid = crawler.is_valid_posting(posting);
            if !valid {
                debug!(
                    company = %crawler.company(),
                    id = %posting.id,
                    missing = ?posting.missing_fields(),
                    "Skipping invalid posting"
                );
            }
            valid
        })
        .collect()
}
