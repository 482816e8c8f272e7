//! Classification helpers shared by the per-company crawlers.
//!
//! Everything here is a plain function over text so crawlers compose the
//! pieces they need instead of inheriting them.

pub mod dates;
pub mod skills;

use crate::types::{CareerType, EmploymentType, Location};

pub use dates::{parse_date, parse_period, parse_period_parts, OPEN_ENDED_MARKERS};
pub use skills::{extract_skills, merge_skills, normalize_skill, normalize_skills};

/// Ordered `label -> keywords` table. The first label with a matching keyword wins.
pub type KeywordTable = [(&'static str, &'static [&'static str])];

/// Job category over title and description.
pub const JOB_CATEGORIES: &KeywordTable = &[
    (
        "Development",
        &["개발", "developer", "engineer", "엔지니어", "프로그래머", "programmer", "software"],
    ),
    ("Design", &["디자인", "디자이너", "designer", "design", "ux", "ui"]),
    ("Planning", &["기획", "product manager", "product owner", "pm", "po"]),
    ("Marketing", &["마케팅", "마케터", "marketing", "marketer", "growth"]),
    ("Data", &["데이터", "data", "analyst", "분석"]),
];

pub const OTHER_CATEGORY: &str = "Other";

/// Technical field inferred from a posting title.
pub const FIELD_KEYWORDS: &KeywordTable = &[
    ("Frontend", &["프론트엔드", "프론트", "frontend", "front-end", "웹 개발", "web"]),
    ("Backend", &["백엔드", "backend", "back-end", "서버", "server"]),
    ("Mobile", &["ios", "android", "안드로이드", "모바일", "mobile", "flutter"]),
    (
        "AI/ML",
        &["머신러닝", "machine learning", "딥러닝", "ml", "ai", "llm", "검색 모델"],
    ),
    (
        "Data Engineering",
        &["데이터 엔지니어", "data engineer", "데이터 플랫폼", "data platform"],
    ),
    ("Data", &["데이터", "data", "분석", "analytics"]),
    (
        "DevOps/SRE",
        &["devops", "sre", "site reliability", "인프라", "infra", "클라우드", "cloud"],
    ),
    ("QA", &["qa", "test", "테스트", "품질"]),
    ("Security", &["security", "보안", "정보보호"]),
];

pub const DEFAULT_FIELD: &str = "Development";

/// `true` if `term` occurs in `haystack` (both lowercase).
///
/// ASCII terms must sit on word boundaries so `java` does not match
/// `javascript` and `go` does not match `google`.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    find_term(haystack, term, 0).is_some()
}

pub(crate) fn find_term(haystack: &str, term: &str, from: usize) -> Option<usize> {
    if term.is_empty() {
        return None;
    }
    let ascii = term.is_ascii();
    let mut start = from;
    while let Some(offset) = haystack.get(start..)?.find(term) {
        let begin = start + offset;
        let end = begin + term.len();
        if !ascii || on_word_boundary(haystack, begin, end) {
            return Some(begin);
        }
        start = begin + haystack[begin..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn on_word_boundary(haystack: &str, begin: usize, end: usize) -> bool {
    let before = haystack[..begin].chars().next_back();
    let after = haystack[end..].chars().next();
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    !is_word(before) && !is_word(after)
}

/// First label in `table` whose keywords occur in `text`.
pub fn first_match(table: &KeywordTable, text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_term(&text, &k.to_lowercase())))
        .map(|(label, _)| *label)
}

/// Category from title plus description, `Other` when nothing matches.
pub fn infer_job_category(title: &str, description: &str) -> &'static str {
    first_match(JOB_CATEGORIES, &format!("{} {}", title, description)).unwrap_or(OTHER_CATEGORY)
}

pub fn infer_field(title: &str) -> Option<&'static str> {
    first_match(FIELD_KEYWORDS, title)
}

/// Career level from free text such as `경력 3년 이상` or `신입/경력`.
pub fn parse_career(text: &str) -> CareerType {
    let text = text.to_lowercase();
    if text.contains("무관") || contains_term(&text, "any") {
        return CareerType::Any;
    }

    let new = ["신입", "new grad", "entry", "junior", "졸업"]
        .iter()
        .any(|k| text.contains(k));
    let experienced = ["경력", "experienced", "senior", "시니어"]
        .iter()
        .any(|k| text.contains(k))
        || (text.contains('년') && extract_number(&text).is_some_and(|n| n > 0))
        || (text.contains("years") && extract_number(&text).is_some_and(|n| n > 0));

    match (new, experienced) {
        (true, false) => CareerType::New,
        (false, true) => CareerType::Experienced,
        _ => CareerType::Any,
    }
}

/// Employment type when the text names one.
pub fn classify_employment(text: &str) -> Option<EmploymentType> {
    let text = text.to_lowercase();
    if ["계약", "contract", "파견", "temporary"]
        .iter()
        .any(|k| text.contains(k))
    {
        Some(EmploymentType::Contract)
    } else if ["인턴", "intern"].iter().any(|k| text.contains(k)) {
        Some(EmploymentType::Intern)
    } else if ["정규", "full-time", "full time", "fulltime", "permanent"]
        .iter()
        .any(|k| text.contains(k))
    {
        Some(EmploymentType::FullTime)
    } else {
        None
    }
}

/// Employment type, full time when the text names none.
pub fn parse_employment_type(text: &str) -> EmploymentType {
    classify_employment(text).unwrap_or(EmploymentType::FullTime)
}

pub const LOCATION_KEYWORDS: &[(Location, &[&str])] = &[
    (
        Location::Bundang,
        &["분당", "판교", "성남", "정자", "bundang", "pangyo", "seongnam"],
    ),
    (
        Location::Seoul,
        &["서울", "강남", "송파", "잠실", "역삼", "seoul", "gangnam"],
    ),
    (Location::Chuncheon, &["춘천", "chuncheon"]),
    (Location::Sejong, &["세종", "sejong"]),
    (Location::Busan, &["부산", "busan"]),
    (
        Location::Global,
        &["해외", "global", "tokyo", "japan", "taiwan", "thailand", "vietnam", "overseas"],
    ),
];

/// Location named in `text`, if any.
pub fn map_location(text: &str) -> Option<Location> {
    let text = text.to_lowercase();
    LOCATION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_term(&text, k)))
        .map(|(location, _)| *location)
}

/// First run of ASCII digits in `text`.
pub fn extract_number(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lines of a block of text, with bullet markers stripped and blanks removed.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '•', '·', '*', '○', '■', '▶'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
