//! Coupang careers (`coupang.jobs`), a paginated server-rendered card list.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use tracing::debug;
use url::Url;

use super::settle_parse;
use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::{
    contains_term, extract_skills, infer_field, infer_job_category, merge_skills, parse_date,
    KeywordTable,
};
use crate::http::HttpFetcher;
use crate::markup::{resolve_url, select_attr, select_text, selector};
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{month_later, CareerType, Company, EmploymentType, JobPosting, JobQuery, Location, Period};

const BASE_URL: &str = "https://www.coupang.jobs/kr/jobs";
const PAGE_SIZE: usize = 20;

pub const DEPARTMENTS: &[&str] = &[
    "Cloud Platform",
    "Corporate IT",
    "eCommerce Product",
    "Product UX",
    "Search and Discovery",
];

const DEFAULT_DEPARTMENT: &str = "Engineering";

/// Title keyword -> department. Earlier rows win.
const DEPARTMENT_KEYWORDS: &KeywordTable = &[
    ("Product UX", &["design system", "designer", "ux", "researcher", "brand"]),
    ("Cloud Platform", &["cloud", "infra"]),
    ("Corporate IT", &["erp", "system"]),
    ("Search and Discovery", &["search", "discovery"]),
    ("eCommerce Product", &["product"]),
    ("Engineering", &["facility", "data center", "server", "director"]),
];

/// Domain terms the shared skill dictionary does not cover.
const DOMAIN_SKILLS: &KeywordTable = &[
    ("SAP", &["sap"]),
    ("ABAP", &["abap"]),
    ("ERP", &["erp"]),
    ("Cloud", &["cloud"]),
    ("Infrastructure", &["infra", "infrastructure"]),
    ("Data Center", &["data center"]),
    ("Design System", &["design system"]),
];

pub struct CoupangCrawler {
    http: Arc<HttpFetcher>,
    max_pages: usize,
}

impl CoupangCrawler {
    pub fn new(http: Arc<HttpFetcher>, max_pages: usize) -> Self {
        Self {
            http,
            max_pages: max_pages.max(1),
        }
    }

    fn page_url(page: usize) -> CrawlResult<Url> {
        let mut url = Url::parse_with_params(
            BASE_URL,
            &[
                ("location", "Seoul, South Korea"),
                ("pagesize", &PAGE_SIZE.to_string()),
                ("page", &page.to_string()),
            ],
        )
        .map_err(|_| CrawlError::InvalidUrl {
            url: BASE_URL.to_string(),
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            for department in DEPARTMENTS {
                pairs.append_pair("department", department);
            }
        }
        Ok(url)
    }

    async fn fetch_page(&self, page: usize, now: DateTime<Utc>) -> CrawlResult<(Vec<JobPosting>, usize)> {
        let url = Self::page_url(page)?;
        let html = self.http.get_text(url.as_str()).await?;
        self.parse_cards(&html, now)
    }

    /// Parse one result page into valid postings.
    pub fn parse_listings(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<Vec<JobPosting>> {
        self.parse_cards(html, now).map(|(postings, _)| postings)
    }

    /// Postings plus the number of cards on the page, valid or not.
    fn parse_cards(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<(Vec<JobPosting>, usize)> {
        let document = Html::parse_document(html);
        let card_sel = selector(".card.card-job")?;
        let title_sel = selector(".card-title a")?;
        let time_sel = selector(".job-meta time")?;

        let mut postings = Vec::new();
        let mut cards = 0;
        for card in document.select(&card_sel) {
            cards += 1;
            let Some(id) = select_attr(card, &title_sel, "href").and_then(|href| job_id(&href)) else {
                debug!("Coupang card without an id");
                continue;
            };
            let title = select_text(card, &title_sel).unwrap_or_default();
            let department = infer_department(&title);

            let start = select_attr(card, &time_sel, "datetime")
                .and_then(|dt| parse_date(&dt))
                .unwrap_or(now);

            let mut posting = JobPosting::template(Company::Coupang, now);
            posting.url = self.job_detail_url(&id);
            posting.source.original_id = id.clone();
            posting.source.original_url = posting.url.clone();
            posting.id = id;
            posting.field = infer_field(&title)
                .map(str::to_string)
                .unwrap_or_else(|| department.to_string());
            posting.department = department.to_string();
            posting.requirements.career = CareerType::Any;
            posting.requirements.skills = merge_skills(
                extract_skills(&title)
                    .into_iter()
                    .chain(domain_skills(&title).map(str::to_string)),
            );
            posting.employment_type = title_employment(&title);
            posting.locations = vec![Location::Seoul];
            posting.period = Period {
                start,
                end: month_later(start),
            };
            posting.job_category = Some(infer_job_category(&title, "").to_string());
            posting.title = title;

            postings.push(posting);
        }

        Ok((retain_valid(self, postings), cards))
    }
}

/// Numeric id from `/kr/jobs/{id}` or `/kr/jobs/{id}?gh_jid=...`.
fn job_id(href: &str) -> Option<String> {
    let url = Url::parse(&resolve_url(BASE_URL, href)?).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "jobs")?;
    segments
        .next()
        .map(str::to_string)
        .filter(|id| !id.is_empty())
}

fn infer_department(title: &str) -> &'static str {
    let title = title.to_lowercase();
    DEPARTMENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_term(&title, k)))
        .map(|(department, _)| *department)
        .unwrap_or(DEFAULT_DEPARTMENT)
}

fn domain_skills(title: &str) -> impl Iterator<Item = &'static str> {
    let title = title.to_lowercase();
    DOMAIN_SKILLS
        .iter()
        .filter(move |(_, keywords)| keywords.iter().any(|k| contains_term(&title, k)))
        .map(|(skill, _)| *skill)
}

/// Listing cards only expose contract roles through the title.
fn title_employment(title: &str) -> EmploymentType {
    let title = title.to_lowercase();
    if title.contains("contract") || title.contains("계약") {
        EmploymentType::Contract
    } else {
        EmploymentType::FullTime
    }
}

#[async_trait]
impl JobCrawler for CoupangCrawler {
    fn company(&self) -> Company {
        Company::Coupang
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, _query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let now = Utc::now();
        let (first, cards) = match self.fetch_page(1, now).await {
            Ok(page) => page,
            Err(e @ CrawlError::Parse(_)) => return Ok(settle_parse(self.company(), Err(e))),
            Err(e) => return Err(e),
        };

        let mut postings = first;
        if cards >= PAGE_SIZE && self.max_pages > 1 {
            let tasks: Vec<_> = (2..=self.max_pages)
                .map(|page| move || self.fetch_page(page, now))
                .collect();
            for (more, _) in self.http.batch(tasks).await {
                postings.extend(more);
            }
        }

        let mut seen = HashSet::new();
        postings.retain(|posting| seen.insert(posting.id.clone()));
        Ok(settle_parse(self.company(), Ok(postings)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpConfig;
    use chrono::TimeZone;

    const FIXTURE: &str = r#"
        <div class="jobs">
          <div class="card card-job">
            <h2 class="card-title"><a href="/kr/jobs/5512345?gh_jid=5512345">Staff Backend Engineer, Search</a></h2>
            <ul class="job-meta"><li>Seoul, South Korea</li><li><time datetime="2024-03-02">Mar 2</time></li></ul>
          </div>
          <div class="card card-job">
            <h2 class="card-title"><a href="/kr/jobs/5512399">SAP ABAP Developer (Contract)</a></h2>
            <ul class="job-meta"><li>Seoul, South Korea</li></ul>
          </div>
          <div class="card card-job">
            <h2 class="card-title"><a>Product Designer</a></h2>
          </div>
        </div>
    "#;

    fn crawler() -> CoupangCrawler {
        CoupangCrawler::new(Arc::new(HttpFetcher::new(HttpConfig::default()).unwrap()), 3)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_cards_and_skips_missing_ids() {
        let (postings, cards) = crawler().parse_cards(FIXTURE, now()).unwrap();
        assert_eq!(cards, 3);
        assert_eq!(postings.len(), 2);

        let search = &postings[0];
        assert_eq!(search.id, "5512345");
        assert_eq!(search.department, "Search and Discovery");
        assert_eq!(search.field, "Backend");
        assert_eq!(search.url, "https://www.coupang.jobs/kr/jobs/5512345");
        assert_eq!(search.period.start, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
        assert_eq!(search.locations, vec![Location::Seoul]);

        let sap = &postings[1];
        assert_eq!(sap.department, "Engineering");
        assert_eq!(sap.employment_type, EmploymentType::Contract);
        assert!(sap.requirements.skills.contains(&"SAP".to_string()));
        assert!(sap.requirements.skills.contains(&"ABAP".to_string()));
        assert_eq!(sap.period.start, now());
    }

    #[test]
    fn department_table_order() {
        assert_eq!(infer_department("Senior UX Researcher"), "Product UX");
        assert_eq!(infer_department("Cloud Infra Engineer"), "Cloud Platform");
        assert_eq!(infer_department("ERP System Engineer"), "Corporate IT");
        assert_eq!(infer_department("Firmware Engineer"), "Engineering");
    }

    #[test]
    fn page_url_repeats_departments() {
        let url = CoupangCrawler::page_url(2).unwrap();
        let departments: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "department")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(departments.len(), DEPARTMENTS.len());
        assert!(url.query_pairs().any(|(k, v)| k == "page" && v == "2"));
    }

    #[test]
    fn job_id_ignores_query() {
        assert_eq!(job_id("/kr/jobs/42?gh_jid=42").as_deref(), Some("42"));
        assert_eq!(job_id("https://www.coupang.jobs/kr/jobs/7/").as_deref(), Some("7"));
        assert_eq!(job_id("/kr/about"), None);
    }
}
