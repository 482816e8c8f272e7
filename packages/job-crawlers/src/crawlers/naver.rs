//! NAVER careers (`recruit.navercorp.com`), a server-rendered card list.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use url::Url;

use super::settle_parse;
use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::{infer_job_category, parse_career, parse_employment_type, parse_period};
use crate::http::HttpFetcher;
use crate::markup::{select_attr, select_text, select_texts, selector};
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{Company, JobPosting, JobQuery, Location};

const BASE_URL: &str = "https://recruit.navercorp.com";

/// Tech sub-job codes: software, hardware, infra, security, tech operations, common.
pub const TECH_JOB_CODES: &[&str] = &[
    "1010001", "1010002", "1010003", "1010004", "1010005", "1010006", "1010007", "1010008",
    "1010009", "1010020", "1020001", "1030001", "1030002", "1040001", "1040002", "1040003",
    "1050001", "1050002", "1060001",
];

lazy_static! {
    static ref SHOW_ID: Regex = Regex::new(r"show\('(\d+)'\)").unwrap();
}

pub struct NaverCrawler {
    http: Arc<HttpFetcher>,
}

impl NaverCrawler {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self { http }
    }

    fn list_url(&self) -> CrawlResult<Url> {
        let list = format!("{}/rcrt/list.do", BASE_URL);
        Url::parse_with_params(&list, &[("subJobCdArr", TECH_JOB_CODES.join(","))])
            .map_err(|_| CrawlError::InvalidUrl { url: list })
    }

    /// Parse the card list. Info fields are positional: department, field,
    /// career, employment type, period.
    pub fn parse_listings(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<Vec<JobPosting>> {
        let document = Html::parse_document(html);
        let card = selector(".card_item")?;
        let title_sel = selector(".card_title")?;
        let info_sel = selector(".info_text")?;
        let link_sel = selector(".card_link")?;

        let mut postings = Vec::new();
        for item in document.select(&card) {
            let info = select_texts(item, &info_sel);
            let field_at = |i: usize| info.get(i).cloned().unwrap_or_default();

            let id = select_attr(item, &link_sel, "onclick")
                .and_then(|onclick| SHOW_ID.captures(&onclick).map(|c| c[1].to_string()))
                .unwrap_or_default();
            let title = select_text(item, &title_sel).unwrap_or_default();

            let mut posting = JobPosting::template(Company::Naver, now);
            posting.url = self.job_detail_url(&id);
            posting.source.original_id = id.clone();
            posting.source.original_url = posting.url.clone();
            posting.id = id;
            posting.job_category = Some(infer_job_category(&title, "").to_string());
            posting.title = title;
            posting.department = field_at(0);
            posting.field = field_at(1);
            posting.requirements.career = parse_career(&field_at(2));
            posting.employment_type = parse_employment_type(&field_at(3));
            posting.period = parse_period(&field_at(4), now);
            posting.locations = vec![Location::Bundang];

            postings.push(posting);
        }

        Ok(retain_valid(self, postings))
    }
}

#[async_trait]
impl JobCrawler for NaverCrawler {
    fn company(&self) -> Company {
        Company::Naver
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, _query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let url = self.list_url()?;
        let html = self.http.get_text(url.as_str()).await?;
        Ok(settle_parse(
            self.company(),
            self.parse_listings(&html, Utc::now()),
        ))
    }

    fn job_detail_url(&self, job_id: &str) -> String {
        format!("{}/rcrt/view/{}", BASE_URL, job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpConfig;
    use crate::types::{CareerType, EmploymentType};
    use chrono::TimeZone;

    const FIXTURE: &str = r#"
        <ul class="card_list">
          <li class="card_item">
            <a class="card_link" href="javascript:void(0)" onclick="show('30001234')">
              <h4 class="card_title">[검색] 백엔드 개발자</h4>
              <dl class="card_info">
                <dd class="info_text">Search</dd>
                <dd class="info_text">Backend</dd>
                <dd class="info_text">경력</dd>
                <dd class="info_text">정규</dd>
                <dd class="info_text">2024.03.01 ~ 2024.03.31</dd>
              </dl>
            </a>
          </li>
          <li class="card_item">
            <a class="card_link" onclick="show('30001235')">
              <h4 class="card_title">iOS 앱 개발 인턴</h4>
              <dl class="card_info">
                <dd class="info_text">Mobile</dd>
                <dd class="info_text">iOS</dd>
                <dd class="info_text">신입</dd>
                <dd class="info_text">인턴</dd>
                <dd class="info_text">상시채용</dd>
              </dl>
            </a>
          </li>
          <li class="card_item">
            <a class="card_link" onclick="javascript:void(0)">
              <h4 class="card_title">No id here</h4>
              <dl class="card_info">
                <dd class="info_text">Infra</dd>
                <dd class="info_text">Cloud</dd>
              </dl>
            </a>
          </li>
        </ul>
    "#;

    fn crawler() -> NaverCrawler {
        NaverCrawler::new(Arc::new(HttpFetcher::new(HttpConfig::default()).unwrap()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_cards_by_position() {
        let postings = crawler().parse_listings(FIXTURE, now()).unwrap();
        assert_eq!(postings.len(), 2);

        let backend = &postings[0];
        assert_eq!(backend.id, "30001234");
        assert_eq!(backend.title, "[검색] 백엔드 개발자");
        assert_eq!(backend.department, "Search");
        assert_eq!(backend.field, "Backend");
        assert_eq!(backend.requirements.career, CareerType::Experienced);
        assert_eq!(backend.employment_type, EmploymentType::FullTime);
        assert_eq!(backend.locations, vec![Location::Bundang]);
        assert_eq!(
            backend.url,
            "https://recruit.navercorp.com/rcrt/view/30001234"
        );
        assert_eq!(backend.source.original_id, "30001234");
        assert_eq!(backend.period.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(backend.job_category.as_deref(), Some("Development"));

        let intern = &postings[1];
        assert_eq!(intern.requirements.career, CareerType::New);
        assert_eq!(intern.employment_type, EmploymentType::Intern);
        assert!(intern.period.is_open_ended());
    }

    #[test]
    fn missing_structure_yields_nothing() {
        let postings = crawler()
            .parse_listings("<html><body><p>점검중</p></body></html>", now())
            .unwrap();
        assert!(postings.is_empty());
    }

    #[test]
    fn list_url_carries_all_tech_codes() {
        let url = crawler().list_url().unwrap();
        let codes = url
            .query_pairs()
            .find(|(k, _)| k == "subJobCdArr")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(codes.split(',').count(), TECH_JOB_CODES.len());
        assert!(url.as_str().starts_with("https://recruit.navercorp.com/rcrt/list.do?"));
    }
}
