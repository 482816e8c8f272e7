//! Danggn careers (`about.daangn.com/jobs`), a static page with generated class names.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scraper::Html;

use super::settle_parse;
use crate::error::CrawlResult;
use crate::heuristics::{extract_skills, first_match, parse_employment_type, KeywordTable};
use crate::http::HttpFetcher;
use crate::markup::{element_text, resolve_url, select_attr, select_text, selector};
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{CareerType, Company, JobPosting, JobQuery, Location, Period};

const BASE_URL: &str = "https://about.daangn.com/jobs";
const ORIGIN: &str = "https://about.daangn.com";
const LISTING_DAYS: i64 = 30;

const ITEM: &str = ".c-deAcZv";
const TITLE: &str = ".c-boyXyq";
const TAG: &str = ".c-kolfYf";

/// Only titles naming one of these roles are technical.
pub const TECH_TITLES: &[&str] = &[
    "Software Engineer",
    "Security Engineer",
    "Site Reliability Engineer",
    "Test Automation Engineer",
    "Application Security Engineer",
    "Information Security Manager",
];

const FIELDS: &KeywordTable = &[
    ("Frontend", &["frontend"]),
    ("Backend", &["backend"]),
    ("Android", &["android"]),
    ("iOS", &["ios"]),
    ("Security", &["security"]),
    ("Infrastructure", &["site reliability"]),
    ("QA", &["test automation"]),
    ("Data", &["data"]),
    ("ML", &["machine learning"]),
];

const DEFAULT_FIELD: &str = "Engineering";

pub struct DanggnCrawler {
    http: Arc<HttpFetcher>,
}

impl DanggnCrawler {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self { http }
    }

    pub fn parse_listings(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<Vec<JobPosting>> {
        let document = Html::parse_document(html);
        let item_sel = selector(ITEM)?;
        let title_sel = selector(TITLE)?;
        let tag_sel = selector(TAG)?;
        let link_sel = selector("a")?;

        let mut postings = Vec::new();
        for item in document.select(&item_sel) {
            let title = select_text(item, &title_sel).unwrap_or_default();
            if !is_tech_title(&title) {
                continue;
            }

            let href = select_attr(item, &link_sel, "href").unwrap_or_default();
            let id = href
                .split(['/', '?'])
                .filter(|s| !s.is_empty())
                .last()
                .unwrap_or_default()
                .to_string();
            let url = if href.is_empty() {
                String::new()
            } else {
                resolve_url(ORIGIN, &href).unwrap_or_default()
            };
            // The employment badge is the last tag on the card.
            let employment = item
                .select(&tag_sel)
                .last()
                .map(element_text)
                .unwrap_or_default();
            let field = first_match(FIELDS, &title).unwrap_or(DEFAULT_FIELD);

            let mut posting = JobPosting::template(Company::Danggn, now);
            posting.id = id.clone();
            posting.source.original_id = id;
            posting.source.original_url = url.clone();
            posting.url = url;
            posting.department = department(&title).to_string();
            posting.field = field.to_string();
            posting.requirements.career = CareerType::Any;
            posting.requirements.skills = extract_skills(&title);
            posting.employment_type = parse_employment_type(&employment);
            posting.locations = vec![Location::Seoul];
            posting.period = Period {
                start: now,
                end: now + Duration::days(LISTING_DAYS),
            };
            posting.job_category = Some(field.to_string());
            posting.tags = Some(Vec::new());
            posting.title = title;

            postings.push(posting);
        }

        Ok(retain_valid(self, postings))
    }
}

fn is_tech_title(title: &str) -> bool {
    TECH_TITLES.iter().any(|t| title.contains(t))
}

fn department(title: &str) -> &'static str {
    if title.contains("당근페이") {
        "당근페이"
    } else {
        "당근"
    }
}

#[async_trait]
impl JobCrawler for DanggnCrawler {
    fn company(&self) -> Company {
        Company::Danggn
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, _query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let html = self.http.get_text(BASE_URL).await?;
        Ok(settle_parse(
            self.company(),
            self.parse_listings(&html, Utc::now()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpConfig;
    use crate::types::EmploymentType;
    use chrono::TimeZone;

    const FIXTURE: &str = r#"
        <ul>
          <li class="c-deAcZv">
            <a href="/jobs/4012345/">
              <h3 class="c-boyXyq">Software Engineer, Backend (당근페이)</h3>
              <span class="c-kolfYf">당근페이</span><span class="c-kolfYf">계약직</span>
            </a>
          </li>
          <li class="c-deAcZv">
            <a href="/jobs/4012399/">
              <h3 class="c-boyXyq">Site Reliability Engineer</h3>
              <span class="c-kolfYf">당근마켓</span><span class="c-kolfYf">정규직</span>
            </a>
          </li>
          <li class="c-deAcZv">
            <a href="/jobs/4012400/">
              <h3 class="c-boyXyq">Product Designer</h3>
              <span class="c-kolfYf">정규직</span>
            </a>
          </li>
        </ul>
    "#;

    fn crawler() -> DanggnCrawler {
        DanggnCrawler::new(Arc::new(HttpFetcher::new(HttpConfig::default()).unwrap()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn keeps_tech_titles() {
        let postings = crawler().parse_listings(FIXTURE, now()).unwrap();
        assert_eq!(postings.len(), 2);

        let pay = &postings[0];
        assert_eq!(pay.id, "4012345");
        assert_eq!(pay.department, "당근페이");
        assert_eq!(pay.field, "Backend");
        assert_eq!(pay.employment_type, EmploymentType::Contract);
        assert_eq!(pay.url, "https://about.daangn.com/jobs/4012345/");
        assert_eq!(pay.period.end - pay.period.start, Duration::days(30));

        let sre = &postings[1];
        assert_eq!(sre.department, "당근");
        assert_eq!(sre.field, "Infrastructure");
        assert_eq!(sre.employment_type, EmploymentType::FullTime);
    }

    #[test]
    fn card_without_link_is_dropped() {
        let html = r#"<div class="c-deAcZv"><h3 class="c-boyXyq">Security Engineer</h3></div>"#;
        assert!(crawler().parse_listings(html, now()).unwrap().is_empty());
    }
}
