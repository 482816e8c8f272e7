//! Toss careers (`toss.im/career/jobs`), rendered client-side.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use serde_json::json;
use url::Url;

use super::{render_listing, settle_parse, RenderPlan};
use crate::browser::BrowserService;
use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::{collapse_whitespace, extract_skills, first_match, KeywordTable};
use crate::markup::{element_text, query_param, select_text, selector};
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{month_later, CareerType, Company, EmploymentType, JobPosting, JobQuery, Location, Period};

const BASE_URL: &str = "https://toss.im/career/jobs";
const DETAIL_URL: &str = "https://toss.im/career/job-detail";
const CATEGORIES: &str = "Backend,Frontend,Infra,QA,Full Stack,App,Engineering";
const LISTING: &str = r#"[href^="/career/job-detail"]"#;
const RENDER_SETTLE: Duration = Duration::from_secs(1);
const INFO_SEPARATOR: char = '・';

/// Terms that mark a listing as technical.
const TECH_TERMS: &[&str] = &[
    "개발", "엔지니어", "Developer", "Engineer", "프론트엔드", "백엔드", "인프라", "보안", "네트워크",
];

/// Affiliates, most specific first; the bare brand is the fallback.
pub const AFFILIATES: &[&str] = &[
    "토스뱅크",
    "토스페이먼츠",
    "토스증권",
    "토스인슈어런스",
    "토스씨엑스",
    "토스플레이스",
    "토스인컴",
    "토스인사이트",
];

const DEFAULT_AFFILIATE: &str = "토스";

const DEPARTMENTS: &KeywordTable = &[
    ("Frontend", &["frontend", "프론트엔드"]),
    ("Backend", &["backend", "백엔드"]),
    ("Data", &["data", "데이터"]),
    ("Security", &["security", "보안"]),
    ("Infrastructure", &["devops", "sre", "인프라"]),
    ("QA", &["qa"]),
    ("Mobile", &["android", "ios"]),
];

const DEFAULT_DEPARTMENT: &str = "Engineering";

/// Stack names the site appends to titles; they belong in the skills list.
const STACK_TERMS: &[&str] = &[
    "typescript", "javascript", "python", "java", "kotlin", "swift", "react", "node.js", "django",
    "spring", "next.js", "nest.js", "kubernetes", "docker", "aws", "gcp", "azure", "ci/cd",
    "jenkins", "terraform", "ansible", "linux", "rdbms",
];

lazy_static! {
    static ref PAREN_INNER: Regex = Regex::new(r"\(\s*([^)]*?)\s*\)").unwrap();
    static ref PAREN_OPEN: Regex = Regex::new(r"\s*\(").unwrap();
}

pub struct TossCrawler {
    browser: Arc<BrowserService>,
}

impl TossCrawler {
    pub fn new(browser: Arc<BrowserService>) -> Self {
        Self { browser }
    }

    fn list_url() -> CrawlResult<Url> {
        Url::parse_with_params(BASE_URL, &[("category", CATEGORIES)]).map_err(|_| {
            CrawlError::InvalidUrl {
                url: BASE_URL.to_string(),
            }
        })
    }

    /// Parse the rendered job list. Each listing carries a bold title, an
    /// optional regular subtitle and a `・`-separated info line.
    pub fn parse_listings(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<Vec<JobPosting>> {
        let document = Html::parse_document(html);
        let listing_sel = selector(LISTING)?;
        let title_sel = selector(r#"span[class*="typography--bold"]"#)?;
        let subtitle_sel = selector(r#"span[class*="typography--regular"]"#)?;
        let info_sel = selector(r#"div[class*="css-84449y"]"#)?;

        let mut postings = Vec::new();
        for item in document.select(&listing_sel) {
            let href = item.value().attr("href").unwrap_or_default();
            let id = query_param(href, "job_id").unwrap_or_default();

            let title = select_text(item, &title_sel).unwrap_or_default();
            let subtitle = select_text(item, &subtitle_sel).unwrap_or_default();
            let info = item
                .select(&info_sel)
                .next()
                .map(element_text)
                .unwrap_or_default();
            let full_text = [title.as_str(), subtitle.as_str(), info.as_str()].join(" ");

            if !TECH_TERMS.iter().any(|term| full_text.contains(term)) {
                continue;
            }

            let department = first_match(DEPARTMENTS, &full_text).unwrap_or(DEFAULT_DEPARTMENT);
            let affiliate = AFFILIATES
                .iter()
                .find(|a| full_text.contains(*a))
                .copied()
                .unwrap_or(DEFAULT_AFFILIATE);
            let tags: Vec<String> = info
                .split(INFO_SEPARATOR)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();

            let mut posting = JobPosting::template(Company::Toss, now);
            posting.url = self.job_detail_url(&id);
            posting.source.original_id = id.clone();
            posting.source.original_url = posting.url.clone();
            posting.id = id;
            posting.title = clean_title(&format!("{} {}", title, subtitle));
            posting.department = department.to_string();
            posting.field = department.to_string();
            posting.job_category = Some(department.to_string());
            posting.requirements.career = CareerType::Any;
            posting.requirements.skills = extract_skills(&full_text);
            posting.employment_type = employment(&full_text);
            posting.locations = vec![Location::Seoul];
            posting.period = Period {
                start: now,
                end: month_later(now),
            };
            posting.tags = Some(tags).filter(|t| !t.is_empty());
            let mut extra = serde_json::Map::new();
            extra.insert("affiliate".to_string(), json!(affiliate));
            posting.company_specific_data = Some(extra);

            postings.push(posting);
        }

        Ok(retain_valid(self, postings))
    }
}

fn employment(text: &str) -> EmploymentType {
    if text.contains("계약직") {
        EmploymentType::Contract
    } else if text.contains("인턴") {
        EmploymentType::Intern
    } else {
        EmploymentType::FullTime
    }
}

/// `true` for a bare stack name such as `Kotlin` or `(Java)`.
fn is_stack_word(word: &str) -> bool {
    let bare = word
        .trim_matches(|c: char| c == '(' || c == ')' || c == ',')
        .to_lowercase();
    STACK_TERMS.contains(&bare.as_str())
}

/// Tidy a listing title: drop separators and repeated words, strip bare
/// stack names (role words such as `Engineer` stay), normalize parentheses.
fn clean_title(raw: &str) -> String {
    let flattened = collapse_whitespace(&raw.replace(INFO_SEPARATOR, " "));

    let mut seen = HashSet::new();
    let words: Vec<&str> = flattened
        .split(' ')
        .filter(|word| seen.insert(word.to_lowercase()))
        .filter(|word| word.contains("Developer") || word.contains("Engineer") || !is_stack_word(word))
        .collect();

    let joined = words.join(" ");
    let tightened = PAREN_INNER.replace_all(&joined, "($1)");
    let spaced = PAREN_OPEN.replace_all(&tightened, " (");
    collapse_whitespace(&spaced.replace("()", ""))
}

#[async_trait]
impl JobCrawler for TossCrawler {
    fn company(&self) -> Company {
        Company::Toss
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, _query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let url = Self::list_url()?;
        let html = render_listing(
            &self.browser,
            RenderPlan {
                url: url.as_str(),
                ready_selector: LISTING,
                scroll: false,
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
        format!("{}?job_id={}", DETAIL_URL, job_id)
    }
}
