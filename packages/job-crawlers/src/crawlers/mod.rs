//! One adapter per careers site.

pub mod baemin;
pub mod coupang;
pub mod danggn;
pub mod kakao;
pub mod line;
pub mod naver;
pub mod toss;

pub use baemin::BaeminCrawler;
pub use coupang::CoupangCrawler;
pub use danggn::DanggnCrawler;
pub use kakao::KakaoCrawler;
pub use line::LineCrawler;
pub use naver::NaverCrawler;
pub use toss::TossCrawler;

use std::time::Duration;

use tracing::{error, info, warn};

use crate::browser::BrowserService;
use crate::error::{CrawlError, CrawlResult};
use crate::types::{Company, JobPosting};

/// How a script-rendered listing page is loaded before its DOM is read.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderPlan<'a> {
    pub url: &'a str,
    /// Selector that appears once the listing has mounted.
    pub ready_selector: &'a str,
    /// Scroll to the bottom so lazily rendered items load.
    pub scroll: bool,
    /// Pause after scrolling for late requests to land.
    pub settle: Duration,
}

/// Render a page in a fresh tab and return its DOM. The tab is closed on
/// every path.
///
/// A ready selector that never shows up is not an error: the DOM is still
/// returned so the parser can report the missing structure. Browser and
/// timeout failures make the service check its connection, so a dead
/// browser is relaunched on the next attempt.
pub(crate) async fn render_listing(browser: &BrowserService, plan: RenderPlan<'_>) -> CrawlResult<String> {
    let page = match browser.create_page().await {
        Ok(page) => page,
        Err(e) => {
            recover_after(browser, &e).await;
            return Err(e);
        }
    };

    let result = async {
        page.goto(plan.url).await?;
        match page.wait_for_selector(plan.ready_selector).await {
            Ok(()) => {}
            Err(CrawlError::Timeout { .. }) => {
                warn!(url = %plan.url, selector = %plan.ready_selector, "Listing never became ready");
            }
            Err(e) => return Err(e),
        }
        if plan.scroll {
            page.scroll_to_bottom().await?;
        }
        if !plan.settle.is_zero() {
            tokio::time::sleep(plan.settle).await;
        }
        page.content().await
    }
    .await;

    browser.close_page(page).await;
    if let Err(e) = &result {
        recover_after(browser, e).await;
    }
    result
}

async fn recover_after(browser: &BrowserService, error: &CrawlError) {
    if needs_recovery(error) && browser.recover().await {
        warn!(error = %error, "Dropped headless browser after page failure");
    }
}

/// Failures that may mean the browser itself is gone.
fn needs_recovery(error: &CrawlError) -> bool {
    matches!(error, CrawlError::Browser(_) | CrawlError::Timeout { .. })
}

/// Settle the outcome of parsing a fetched page.
///
/// A page that parsed to nothing is logged as a likely markup change, and a
/// parse failure degrades to an empty list so one broken site never fails
/// the whole refresh.
pub(crate) fn settle_parse(company: Company, result: CrawlResult<Vec<JobPosting>>) -> Vec<JobPosting> {
    match result {
        Ok(postings) if postings.is_empty() => {
            error!(company = %company, "No listings found; markup may have changed");
            postings
        }
        Ok(postings) => {
            info!(company = %company, count = postings.len(), "Parsed listings");
            postings
        }
        Err(e) => {
            error!(company = %company, error = %e, "Failed to parse listings");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use chrono::Utc;

    #[test]
    fn parse_failures_degrade_to_empty() {
        let settled = settle_parse(Company::Line, Err(CrawlError::Parse("bad".into())));
        assert!(settled.is_empty());
    }

    #[test]
    fn only_browser_and_timeout_failures_trigger_recovery() {
        let timeout = CrawlError::Timeout {
            operation: "navigation".into(),
            millis: 30_000,
        };
        assert!(needs_recovery(&timeout));
        assert!(needs_recovery(&CrawlError::Browser("ws closed".into())));
        assert!(!needs_recovery(&CrawlError::Parse("no cards".into())));
        assert!(!needs_recovery(&CrawlError::BrowserUnavailable));
    }

    #[tokio::test]
    async fn render_failure_without_browser_stays_unavailable() {
        let browser = BrowserService::new(crate::browser::RenderConfig::default());
        browser.shutdown().await;

        let plan = RenderPlan {
            url: "https://careers.example.com",
            ready_selector: ".list",
            scroll: false,
            settle: Duration::ZERO,
        };
        assert!(matches!(
            render_listing(&browser, plan).await,
            Err(CrawlError::BrowserUnavailable)
        ));
    }

    #[test]
    fn parsed_postings_pass_through() {
        let posting = JobPosting::template(Company::Line, Utc::now());
        let settled = settle_parse(Company::Line, Ok(vec![posting.clone()]));
        assert_eq!(settled, vec![posting]);
    }
}
