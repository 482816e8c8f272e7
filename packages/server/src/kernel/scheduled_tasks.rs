//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! A single periodic task refreshes every job source through
//! [`JobsService::refresh_all`], the same path read misses use, so a scheduled
//! refresh and an on-demand one for the same company collapse into one crawl.
//!
//! ```text
//! Scheduler (JOBS_UPDATE_CRON)
//!     │
//!     └─► refresh_all()
//!             └─► ensure_fresh(company) for every registered source
//! ```

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::jobs::JobsService;

/// Start all scheduled tasks
pub async fn start_scheduler(jobs: JobsService, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let refresh_jobs = jobs.clone();
    let refresh_job = Job::new_async_tz(cron, chrono::Local, move |_uuid, _lock| {
        let jobs = refresh_jobs.clone();
        Box::pin(async move {
            run_job_refresh(&jobs).await;
        })
    })
    .with_context(|| format!("Invalid JOBS_UPDATE_CRON expression: {}", cron))?;

    scheduler.add(refresh_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (job refresh on \"{}\")", cron);
    Ok(scheduler)
}

/// Run one scheduled refresh of every source
async fn run_job_refresh(jobs: &JobsService) {
    tracing::info!("Running scheduled job refresh");

    let report = jobs.refresh_all().await;

    if report.any_succeeded() {
        tracing::info!(
            "Scheduled refresh complete: {} postings from {} sources ({} failed)",
            report.total_postings(),
            report.succeeded.len(),
            report.failed.len()
        );
    } else {
        tracing::error!(
            "Scheduled refresh failed for all {} sources",
            report.failed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use job_crawlers::testing::MockCrawler;
    use job_crawlers::{Company, CrawlerRegistry, RetryPolicy};

    use crate::kernel::MemoryCache;

    fn jobs() -> JobsService {
        let mut registry = CrawlerRegistry::new();
        registry.register(Arc::new(MockCrawler::new(Company::Line)));
        JobsService::new(
            Arc::new(MemoryCache::new()),
            registry,
            RetryPolicy::immediate(1),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn rejects_malformed_cron() {
        assert!(start_scheduler(jobs(), "every three hours").await.is_err());
    }

    #[tokio::test]
    async fn accepts_default_schedule() {
        let mut scheduler = start_scheduler(jobs(), crate::config::DEFAULT_UPDATE_CRON)
            .await
            .unwrap();
        scheduler.shutdown().await.unwrap();
    }
}
