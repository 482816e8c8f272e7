//! Kakao careers JSON API (`careers.kakao.com/public/api/job-list`).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::{
    classify_employment, collapse_whitespace, extract_skills, infer_field, infer_job_category,
    map_location, merge_skills, parse_career, parse_period_parts, split_lines, DEFAULT_FIELD,
};
use crate::http::HttpFetcher;
use crate::traits::{retain_valid, JobCrawler};
use crate::types::{Company, EmploymentType, JobPosting, JobQuery, Location};

const BASE_URL: &str = "https://careers.kakao.com";
const API_URL: &str = "https://careers.kakao.com/public/api/job-list";
const PREFERENCES_MARKER: &str = "우대사항";

/// One page of the job-list API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListPage {
    #[serde(default)]
    pub job_list: Vec<serde_json::Value>,
    #[serde(default)]
    pub total_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KakaoJob {
    real_id: Option<String>,
    job_offer_title: Option<String>,
    job_part_name: Option<String>,
    skill_set_list: Vec<SkillSet>,
    qualification: Option<String>,
    employee_type_name: Option<String>,
    location_name: Option<String>,
    reg_date: Option<String>,
    end_date: Option<String>,
    work_content_desc: Option<String>,
    introduction: Option<String>,
    work_type_desc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SkillSet {
    skill_set_name: Option<String>,
}

pub struct KakaoCrawler {
    http: Arc<HttpFetcher>,
    max_pages: usize,
}

impl KakaoCrawler {
    pub fn new(http: Arc<HttpFetcher>, max_pages: usize) -> Self {
        Self {
            http,
            max_pages: max_pages.max(1),
        }
    }

    fn page_url(page: u32) -> CrawlResult<Url> {
        Url::parse_with_params(
            API_URL,
            &[
                ("skillSet", ""),
                ("part", "TECHNOLOGY"),
                ("company", "KAKAO"),
                ("employeeType", ""),
                ("page", &page.to_string()),
            ],
        )
        .map_err(|_| CrawlError::InvalidUrl {
            url: API_URL.to_string(),
        })
    }

    async fn fetch_page(&self, page: u32) -> CrawlResult<JobListPage> {
        let url = Self::page_url(page)?;
        self.http.get_json(url.as_str()).await
    }

    /// Map API entries to postings; entries that fail to decode are skipped.
    pub fn parse_job_list(&self, entries: &[serde_json::Value], now: DateTime<Utc>) -> Vec<JobPosting> {
        let postings = entries
            .iter()
            .filter_map(|raw| match serde_json::from_value::<KakaoJob>(raw.clone()) {
                Ok(job) => Some(self.to_posting(job, raw, now)),
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable Kakao listing");
                    None
                }
            })
            .collect();
        retain_valid(self, postings)
    }

    fn to_posting(&self, job: KakaoJob, raw: &serde_json::Value, now: DateTime<Utc>) -> JobPosting {
        let real_id = job.real_id.unwrap_or_default();
        let qualification = html_breaks_to_newlines(job.qualification.as_deref().unwrap_or(""));
        let (requirements, preferences) = split_qualification(&qualification);
        let title = collapse_whitespace(job.job_offer_title.as_deref().unwrap_or(""));

        let skill_set_names: Vec<String> = job
            .skill_set_list
            .iter()
            .filter_map(|s| s.skill_set_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty() && !matches!(name.to_lowercase().as_str(), "etc" | "기타"))
            .map(str::to_string)
            .collect();

        let field = skill_set_names
            .first()
            .cloned()
            .or_else(|| infer_field(&title).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_FIELD.to_string());

        let description = {
            let intro = html_breaks_to_newlines(job.introduction.as_deref().unwrap_or(""));
            let work = html_breaks_to_newlines(job.work_content_desc.as_deref().unwrap_or(""));
            let text = format!("{}\n\n[주요업무]\n{}", intro.trim(), work.trim());
            Some(text.trim().to_string()).filter(|t| t != "[주요업무]")
        };

        let benefits: Vec<String> = html_breaks_to_newlines(job.work_type_desc.as_deref().unwrap_or(""))
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with('•'))
            .map(|line| line.trim_start_matches('•').trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        let location_text = job.location_name.unwrap_or_default();
        let location = if location_text.trim().is_empty() {
            Location::Bundang
        } else {
            map_location(&location_text).unwrap_or(Location::Other)
        };

        let mut posting = JobPosting::template(Company::Kakao, now);
        posting.id = real_id.trim_start_matches("P-").to_string();
        posting.url = self.job_detail_url(&real_id);
        posting.source.original_id = real_id;
        posting.source.original_url = posting.url.clone();
        posting.department = job.job_part_name.unwrap_or_default().trim().to_string();
        posting.field = field;
        posting.requirements.career = parse_career(&qualification);
        posting.requirements.skills = merge_skills(extract_skills(&qualification).into_iter().chain(skill_set_names));
        posting.employment_type = job
            .employee_type_name
            .as_deref()
            .and_then(classify_employment)
            .unwrap_or(EmploymentType::FullTime);
        posting.locations = vec![location];
        posting.job_category = Some(
            infer_job_category(&title, description.as_deref().unwrap_or("")).to_string(),
        );
        posting.description = description;
        posting.qualifications = Some(requirements).filter(|r| !r.is_empty());
        posting.preferences = Some(preferences).filter(|p| !p.is_empty());
        posting.benefits = Some(benefits).filter(|b| !b.is_empty());
        posting.period = parse_period_parts(job.reg_date.as_deref(), job.end_date.as_deref(), now);
        posting.title = title;
        posting.raw_data = Some(raw.clone());
        posting
    }
}

fn html_breaks_to_newlines(text: &str) -> String {
    text.replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<br>", "\n")
}

/// Split qualification text into requirements and preferences at the
/// preferences heading.
fn split_qualification(text: &str) -> (Vec<String>, Vec<String>) {
    let mut requirements = Vec::new();
    let mut preferences = Vec::new();
    let mut in_preferences = false;

    for line in text.lines() {
        if line.contains(PREFERENCES_MARKER) {
            in_preferences = true;
            continue;
        }
        let target = if in_preferences {
            &mut preferences
        } else {
            &mut requirements
        };
        target.extend(split_lines(line));
    }

    (requirements, preferences)
}

#[async_trait]
impl JobCrawler for KakaoCrawler {
    fn company(&self) -> Company {
        Company::Kakao
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn fetch_jobs(&self, _query: Option<&JobQuery>) -> CrawlResult<Vec<JobPosting>> {
        let first = self.fetch_page(1).await?;
        let total_pages = first
            .total_page
            .unwrap_or(1)
            .clamp(1, self.max_pages as u32);

        let mut entries = first.job_list;
        if total_pages > 1 {
            let tasks: Vec<_> = (2..=total_pages)
                .map(|page| move || self.fetch_page(page))
                .collect();
            for page in self.http.batch(tasks).await {
                entries.extend(page.job_list);
            }
        }

        let postings = self.parse_job_list(&entries, Utc::now());
        info!(
            company = %self.company(),
            pages = total_pages,
            count = postings.len(),
            "Parsed listings"
        );
        Ok(postings)
    }

    fn job_detail_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}", BASE_URL, job_id)
    }
}
