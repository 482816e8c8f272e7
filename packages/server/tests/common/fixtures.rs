//! Test fixtures for creating postings and scripted crawlers.

use std::sync::Arc;

use chrono::Utc;
use job_crawlers::testing::{sample_posting, MockCrawler};
use job_crawlers::{CareerType, Company, JobPosting};

/// `count` valid postings for `company`, with ids `1..=count`.
pub fn postings(company: Company, count: usize) -> Vec<JobPosting> {
    let now = Utc::now();
    (1..=count)
        .map(|i| sample_posting(company, &i.to_string(), &format!("Developer {}", i), now))
        .collect()
}

/// A posting requiring the given career level.
pub fn posting_with_career(company: Company, id: &str, career: CareerType) -> JobPosting {
    let mut posting = sample_posting(company, id, "Server Developer", Utc::now());
    posting.requirements.career = career;
    posting
}

/// A crawler answering with `count` postings.
pub fn crawler_with(company: Company, count: usize) -> Arc<MockCrawler> {
    Arc::new(MockCrawler::new(company).with_postings(postings(company, count)))
}

/// A crawler that fails every attempt.
pub fn broken_crawler(company: Company) -> Arc<MockCrawler> {
    Arc::new(MockCrawler::new(company).always_failing())
}
