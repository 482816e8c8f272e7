//! Woowa Brothers careers (`career.woowahan.com`), a client-rendered list
//! that needs the headless browser.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use url::Url;

use super::{render_listing, settle_parse, RenderPlan};
use crate::browser::BrowserService;
use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::{
    classify_employment, first_match, infer_job_category, map_location, normalize_skills,
    parse_career, KeywordTable,
};
use crate::markup::{element_text, query_param, resolve_url, select_attr, select_text, selector};
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{Company, EmploymentType, JobPosting, JobQuery, Location, Period};

const BASE_URL: &str = "https://career.woowahan.com";
const READY_SELECTOR: &str = ".recruit-type-list";
const DEVELOPMENT_GROUP: &str = "jobGroupCodes:BA005001";
const RENDER_SETTLE: Duration = Duration::from_secs(2);
const DEFAULT_LOCATION: &str = "서울";
const DEFAULT_DEPARTMENT: &str = "우아한형제들";

const FIELDS: &KeywordTable = &[
    ("프론트엔드 개발", &["프론트엔드", "frontend"]),
    ("백엔드 개발", &["백엔드", "backend", "서버"]),
    ("데이터 엔지니어링", &["데이터", "data"]),
    ("AI/ML", &["ai", "ml", "머신러닝"]),
    ("DevOps/SRE", &["devops", "sre"]),
    ("QA/테스트", &["qa", "test"]),
    ("보안", &["security", "보안"]),
];

const DEFAULT_FIELD: &str = "개발";

pub struct BaeminCrawler {
    browser: Arc<BrowserService>,
}

impl BaeminCrawler {
    pub fn new(browser: Arc<BrowserService>) -> Self {
        Self { browser }
    }

    fn list_url(query: Option<&JobQuery>) -> CrawlResult<Url> {
        let mut url = Url::parse_with_params(
            BASE_URL,
            &[
                ("jobCodes", ""),
                ("employmentTypeCodes", ""),
                ("serviceSectionCodes", ""),
                ("careerPeriod", ""),
                ("keyword", ""),
                ("category", DEVELOPMENT_GROUP),
            ],
        )
        .map_err(|_| CrawlError::InvalidUrl {
            url: BASE_URL.to_string(),
        })?;

        if let Some(page) = query.and_then(|q| q.page) {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        url.set_fragment(Some("recruit-list"));
        Ok(url)
    }

    /// Parse the rendered recruit list.
    pub fn parse_listings(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<Vec<JobPosting>> {
        let document = Html::parse_document(html);
        let item_sel = selector(".recruit-type-list li")?;
        let link_sel = selector("a.title")?;
        let title_sel = selector(".fr-view")?;
        let career_sel = selector(".flag-career")?;
        let location_sel = selector(".flag-btn")?;
        let tag_sel = selector(".flag-tag")?;

        let mut postings = Vec::new();
        for item in document.select(&item_sel) {
            let title = select_text(item, &title_sel).unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            let href = select_attr(item, &link_sel, "href");
            let id = href
                .as_deref()
                .and_then(|h| query_param(h, "jobCodes"))
                .unwrap_or_else(|| synthesize_id(&title));
            let url = href
                .as_deref()
                .and_then(|h| resolve_url(BASE_URL, h))
                .unwrap_or_else(|| self.job_detail_url(&id));

            let (skills, tags) = split_flags(item.select(&tag_sel).map(element_text));
            let location = select_text(item, &location_sel).unwrap_or_else(|| DEFAULT_LOCATION.to_string());

            let mut posting = JobPosting::template(Company::Baemin, now);
            posting.id = id.clone();
            posting.source.original_id = id;
            posting.source.original_url = url.clone();
            posting.url = url;
            posting.department = department(&title).unwrap_or(DEFAULT_DEPARTMENT).to_string();
            posting.field = first_match(FIELDS, &title).unwrap_or(DEFAULT_FIELD).to_string();
            posting.requirements.career = parse_career(&select_text(item, &career_sel).unwrap_or_default());
            posting.requirements.skills = skills;
            posting.employment_type = classify_employment(&title).unwrap_or(EmploymentType::FullTime);
            posting.locations = vec![map_location(&location).unwrap_or(Location::Other)];
            posting.period = Period::default_from(now);
            posting.job_category = Some(infer_job_category(&title, "").to_string());
            posting.tags = Some(tags);
            posting.title = title;

            postings.push(posting);
        }

        Ok(retain_valid(self, postings))
    }
}

/// `#`-prefixed flags are skills (several may share one flag), the rest are tags.
fn split_flags(flags: impl Iterator<Item = String>) -> (Vec<String>, Vec<String>) {
    let mut raw_skills = Vec::new();
    let mut tags = Vec::new();
    for flag in flags.filter(|f| !f.is_empty()) {
        if flag.starts_with('#') {
            raw_skills.extend(
                flag.split('#')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );
        } else {
            tags.push(flag);
        }
    }
    (normalize_skills(raw_skills), tags)
}

/// Team name in titles like `[배민] 커머스서비스팀 백엔드 개발자`: the first
/// word after `]` ending in 실 or 팀.
fn department(title: &str) -> Option<&str> {
    let (_, rest) = title.split_once(']')?;
    rest.split_whitespace()
        .find(|word| word.ends_with('실') || word.ends_with('팀'))
}

/// Stable id for listings without an upstream code: the title lowercased,
/// punctuation dropped and whitespace turned into dashes.
fn synthesize_id(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !"[]/{}()*+?.\\^$|".contains(*c))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
}

#[async_trait]
impl JobCrawler for BaeminCrawler {
    fn company(&self) -> Company {
        Company::Baemin
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let url = Self::list_url(query)?;
        let html = render_listing(
            &self.browser,
            RenderPlan {
                url: url.as_str(),
                ready_selector: READY_SELECTOR,
                scroll: true,
                settle: RENDER_SETTLE,
            },
        )
        .await?;
        Ok(settle_parse(
            self.company(),
            self.parse_listings(&html, Utc::now()),
        ))
    }

    fn job_detail_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}", BASE_URL, job_id)
    }
}
