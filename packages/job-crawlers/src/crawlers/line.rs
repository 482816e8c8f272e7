//! LINE careers (`careers.linecorp.com`), server-rendered list filtered to engineering.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use url::Url;

use super::settle_parse;
use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::{infer_job_category, parse_employment_type, parse_period};
use crate::http::HttpFetcher;
use crate::markup::{select_attr, select_text, select_texts, selector};
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{CareerType, Company, JobPosting, JobQuery, Location};

const BASE_URL: &str = "https://careers.linecorp.com/ko/jobs";
const ENGINEERING: &str = "Engineering";

pub struct LineCrawler {
    http: Arc<HttpFetcher>,
}

impl LineCrawler {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self { http }
    }

    fn list_url(&self, query: Option<&JobQuery>) -> CrawlResult<Url> {
        let mut url = Url::parse_with_params(
            BASE_URL,
            &[
                ("ca", ENGINEERING),
                ("ci", "Gwacheon,Bundang"),
                ("co", "East Asia"),
            ],
        )
        .map_err(|_| CrawlError::InvalidUrl {
            url: BASE_URL.to_string(),
        })?;

        if let Some(page) = query.and_then(|q| q.page) {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    /// Parse `.job_list` entries. The filter spans are positional:
    /// location, (unused), department, employment type.
    pub fn parse_listings(&self, html: &str, now: DateTime<Utc>) -> CrawlResult<Vec<JobPosting>> {
        let document = Html::parse_document(html);
        let item_sel = selector(".job_list li")?;
        let link_sel = selector("a")?;
        let title_sel = selector("h3.title")?;
        let filter_sel = selector(".text_filter span")?;
        let date_sel = selector(".date")?;

        let mut postings = Vec::new();
        for item in document.select(&item_sel) {
            let filters = select_texts(item, &filter_sel);
            let filter_at = |i: usize| filters.get(i).cloned().unwrap_or_default();

            let department = filter_at(2);
            if department != ENGINEERING {
                continue;
            }

            let id = select_attr(item, &link_sel, "href")
                .and_then(|href| {
                    href.trim_end_matches('/')
                        .rsplit('/')
                        .next()
                        .map(str::to_string)
                })
                .unwrap_or_default();
            let title = select_text(item, &title_sel).unwrap_or_default();

            let mut posting = JobPosting::template(Company::Line, now);
            posting.url = self.job_detail_url(&id);
            posting.source.original_id = id.clone();
            posting.source.original_url = posting.url.clone();
            posting.id = id;
            posting.job_category = Some(infer_job_category(&title, "").to_string());
            posting.title = title;
            posting.field = department.clone();
            posting.department = department;
            posting.requirements.career = CareerType::Any;
            posting.employment_type = parse_employment_type(&filter_at(3));
            posting.locations = vec![site_location(&filter_at(0))];
            posting.period = parse_period(&select_text(item, &date_sel).unwrap_or_default(), now);

            postings.push(posting);
        }

        Ok(retain_valid(self, postings))
    }
}

/// The site labels offices in English; anything outside Korea is global.
fn site_location(label: &str) -> Location {
    match label.trim() {
        "Bundang" => Location::Bundang,
        "Seoul" => Location::Seoul,
        _ => Location::Global,
    }
}

#[async_trait]
impl JobCrawler for LineCrawler {
    fn company(&self) -> Company {
        Company::Line
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let url = self.list_url(query)?;
        let html = self.http.get_text(url.as_str()).await?;
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
        <ul class="job_list">
          <li>
            <a href="/ko/jobs/2871">
              <h3 class="title">Server Engineer (LINE Messenger)</h3>
              <div class="text_filter">
                <span>Bundang</span><span>LINE Plus</span><span>Engineering</span><span>Full-time</span>
              </div>
              <span class="date">2024.03.04 ~ 채용시까지</span>
            </a>
          </li>
          <li>
            <a href="/ko/jobs/2872/">
              <h3 class="title">Android Engineer</h3>
              <div class="text_filter">
                <span>Tokyo</span><span>LY Corp</span><span>Engineering</span><span>Contract</span>
              </div>
              <span class="date">2024.03.01 ~ 2024.04.30</span>
            </a>
          </li>
          <li>
            <a href="/ko/jobs/2873">
              <h3 class="title">Brand Designer</h3>
              <div class="text_filter">
                <span>Seoul</span><span>LINE Plus</span><span>Design</span><span>Full-time</span>
              </div>
              <span class="date">2024.03.01 ~ 2024.03.31</span>
            </a>
          </li>
        </ul>
    "#;

    fn crawler() -> LineCrawler {
        LineCrawler::new(Arc::new(HttpFetcher::new(HttpConfig::default()).unwrap()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn keeps_engineering_listings_only() {
        let postings = crawler().parse_listings(FIXTURE, now()).unwrap();
        let ids: Vec<&str> = postings.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2871", "2872"]);

        let server = &postings[0];
        assert_eq!(server.department, "Engineering");
        assert_eq!(server.field, "Engineering");
        assert_eq!(server.locations, vec![Location::Bundang]);
        assert_eq!(server.employment_type, EmploymentType::FullTime);
        assert!(server.period.is_open_ended());
        assert_eq!(server.url, "https://careers.linecorp.com/ko/jobs/2871");

        let android = &postings[1];
        assert_eq!(android.locations, vec![Location::Global]);
        assert_eq!(android.employment_type, EmploymentType::Contract);
        assert!(!android.period.is_open_ended());
    }

    #[test]
    fn list_url_applies_filters_and_page() {
        let query = JobQuery::default().with_page(3);
        let url = crawler().list_url(Some(&query)).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("ca".into(), "Engineering".into())));
        assert!(pairs.contains(&("ci".into(), "Gwacheon,Bundang".into())));
        assert!(pairs.contains(&("page".into(), "3".into())));
    }
}
