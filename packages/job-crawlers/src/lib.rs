//! Tech job posting crawlers for Korean IT companies.
//!
//! Each supported careers site has a bespoke adapter that turns its listing
//! (static HTML, a JSON API, or a script-rendered page) into the shared
//! [`JobPosting`] model. The adapters lean on a small set of shared pieces:
//!
//! - [`http`] - pooled HTTP client with rotating user agents, concurrency-bounded batches
//! - [`browser`] - shared headless Chromium for script-rendered listings
//! - [`heuristics`] - career, employment, location, skill and date classification
//! - [`retry`] - exponential backoff with jitter
//! - [`registry`] - crawler lookup by company
//! - [`testing`] - mock crawler for orchestrator tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_crawlers::{CrawlerDeps, CrawlerRegistry, HttpConfig, HttpFetcher};
//!
//! let http = Arc::new(HttpFetcher::new(HttpConfig::default())?);
//! let registry = CrawlerRegistry::with_default_crawlers(CrawlerDeps {
//!     http,
//!     browser: None,
//!     max_pages: 10,
//! });
//!
//! for (company, crawler) in registry.iter() {
//!     let postings = crawler.fetch_jobs(None).await?;
//!     println!("{}: {} postings", company, postings.len());
//! }
//! ```

pub mod browser;
pub mod crawlers;
pub mod error;
pub mod heuristics;
pub mod http;
pub mod markup;
pub mod registry;
pub mod retry;
pub mod testing;
pub mod traits;
pub mod types;

pub use browser::{BrowserService, RenderConfig, RenderPage};
pub use error::{CrawlError, CrawlResult};
pub use http::{run_batch, HttpConfig, HttpFetcher};
pub use registry::{CrawlerDeps, CrawlerRegistry};
pub use retry::{retry_with_backoff, retry_with_backoff_if, RetryPolicy};
pub use traits::JobCrawler;
pub use types::{
    CareerType, Company, EmploymentType, JobPosting, JobQuery, Location, Period, PostingSource,
    Requirements, UnknownCompany,
};
