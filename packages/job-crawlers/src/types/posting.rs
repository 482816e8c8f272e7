//! Canonical job posting model shared by every crawler.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Upstream source (company) a posting was crawled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Company {
    Naver,
    NaverCloud,
    Snow,
    NaverLabs,
    NaverWebtoon,
    NaverFinancial,
    NaverIs,
    Kakao,
    Line,
    Coupang,
    Baemin,
    Danggn,
    Toss,
}

impl Company {
    pub const ALL: [Company; 13] = [
        Company::Naver,
        Company::NaverCloud,
        Company::Snow,
        Company::NaverLabs,
        Company::NaverWebtoon,
        Company::NaverFinancial,
        Company::NaverIs,
        Company::Kakao,
        Company::Line,
        Company::Coupang,
        Company::Baemin,
        Company::Danggn,
        Company::Toss,
    ];

    /// Wire code, e.g. `NAVER_CLOUD`.
    pub fn code(&self) -> &'static str {
        match self {
            Company::Naver => "NAVER",
            Company::NaverCloud => "NAVER_CLOUD",
            Company::Snow => "SNOW",
            Company::NaverLabs => "NAVER_LABS",
            Company::NaverWebtoon => "NAVER_WEBTOON",
            Company::NaverFinancial => "NAVER_FINANCIAL",
            Company::NaverIs => "NAVER_IS",
            Company::Kakao => "KAKAO",
            Company::Line => "LINE",
            Company::Coupang => "COUPANG",
            Company::Baemin => "BAEMIN",
            Company::Danggn => "DANGGN",
            Company::Toss => "TOSS",
        }
    }

    /// Human readable name shown in the catalog.
    pub fn display_name(&self) -> &'static str {
        match self {
            Company::Naver => "네이버",
            Company::NaverCloud => "네이버클라우드",
            Company::Snow => "스노우",
            Company::NaverLabs => "네이버랩스",
            Company::NaverWebtoon => "네이버웹툰",
            Company::NaverFinancial => "네이버파이낸셜",
            Company::NaverIs => "네이버아이에스",
            Company::Kakao => "카카오",
            Company::Line => "라인",
            Company::Coupang => "쿠팡",
            Company::Baemin => "배달의민족",
            Company::Danggn => "당근",
            Company::Toss => "토스",
        }
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unknown company code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCompany(pub String);

impl fmt::Display for UnknownCompany {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown company: {}", self.0)
    }
}

impl std::error::Error for UnknownCompany {}

impl FromStr for Company {
    type Err = UnknownCompany;

    /// Case-insensitive; accepts `naver-cloud` as well as `NAVER_CLOUD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Company::ALL
            .into_iter()
            .find(|c| c.code() == normalized)
            .ok_or_else(|| UnknownCompany(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CareerType {
    New,
    Experienced,
    Any,
}

impl CareerType {
    pub fn code(&self) -> &'static str {
        match self {
            CareerType::New => "NEW",
            CareerType::Experienced => "EXPERIENCED",
            CareerType::Any => "ANY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    FullTime,
    Contract,
    Intern,
}

impl EmploymentType {
    pub fn code(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "FULL_TIME",
            EmploymentType::Contract => "CONTRACT",
            EmploymentType::Intern => "INTERN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Bundang,
    Seoul,
    Chuncheon,
    Sejong,
    Busan,
    Global,
    Other,
}

impl Location {
    pub fn code(&self) -> &'static str {
        match self {
            Location::Bundang => "BUNDANG",
            Location::Seoul => "SEOUL",
            Location::Chuncheon => "CHUNCHEON",
            Location::Sejong => "SEJONG",
            Location::Busan => "BUSAN",
            Location::Global => "GLOBAL",
            Location::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    pub career: CareerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Application window of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// `(now, now + 1 month)`, used when upstream dates are missing or unparseable.
    pub fn default_from(now: DateTime<Utc>) -> Self {
        Self {
            start: now,
            end: month_later(now),
        }
    }

    /// Posting that stays open until the position is filled.
    pub fn open_ended(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: open_until_filled(),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.end == open_until_filled()
    }
}

/// Sentinel end date for postings without a deadline (2099-12-31).
pub fn open_until_filled() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2099, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn month_later(from: DateTime<Utc>) -> DateTime<Utc> {
    from.checked_add_months(Months::new(1))
        .unwrap_or(from + chrono::Duration::days(30))
}

/// Provenance: the literal upstream identity of a posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingSource {
    pub original_id: String,
    pub original_url: String,
}

/// One normalized job listing produced by a crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub company: Company,
    pub title: String,
    pub department: String,
    pub field: String,
    pub requirements: Requirements,
    pub employment_type: EmploymentType,
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Vec<String>>,
    pub period: Period,
    pub url: String,
    pub source: PostingSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_specific_data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,
}

impl JobPosting {
    /// Blank posting for `company` with the usual defaults: any career,
    /// full time, a one month window starting at `now`.
    pub fn template(company: Company, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            company,
            title: String::new(),
            department: String::new(),
            field: String::new(),
            requirements: Requirements {
                career: CareerType::Any,
                education: None,
                skills: Vec::new(),
            },
            employment_type: EmploymentType::FullTime,
            locations: Vec::new(),
            description: None,
            qualifications: None,
            preferences: None,
            benefits: None,
            period: Period::default_from(now),
            url: String::new(),
            source: PostingSource {
                original_id: String::new(),
                original_url: String::new(),
            },
            created_at: now,
            updated_at: now,
            tags: None,
            job_category: None,
            job_sub_category: None,
            company_specific_data: None,
            raw_data: None,
        }
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("id", &self.id),
            ("title", &self.title),
            ("department", &self.department),
            ("field", &self.field),
            ("url", &self.url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// A posting is cacheable only when every identifying field is present.
    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Equality ignoring `created_at`/`updated_at`.
    pub fn same_content(&self, other: &JobPosting) -> bool {
        let mut other = other.clone();
        other.created_at = self.created_at;
        other.updated_at = self.updated_at;
        *self == other
    }
}
