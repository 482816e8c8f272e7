//! Cache key namespace for job postings.

use job_crawlers::{Company, JobQuery};

/// Every posting from every source, maintained by per-source merges.
pub const ALL_JOBS: &str = "jobs:all";
/// Prefix of filtered read keys.
pub const TECH_JOBS: &str = "jobs:tech";
/// RFC 3339 timestamp of the last refresh in which a source succeeded.
pub const LAST_UPDATE: &str = "jobs:last-update";
/// Matches every key this module produces.
pub const NAMESPACE_PATTERN: &str = "jobs:*";

pub fn company_key(company: Company) -> String {
    format!("jobs:company:{}", company.code())
}

/// Key for a cross-source read. Unfiltered reads use [`ALL_JOBS`]; filtered
/// reads append `name:value` segments in a fixed order. Pagination never
/// affects the key.
pub fn tech_query_key(query: &JobQuery) -> String {
    if !query.has_filters() {
        return ALL_JOBS.to_string();
    }

    let text = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    };

    let segments = [
        ("department", text(&query.department)),
        ("field", text(&query.field)),
        ("career", query.career.map(|c| c.code().to_string())),
        (
            "employmentType",
            query.employment_type.map(|e| e.code().to_string()),
        ),
        ("location", query.location.map(|l| l.code().to_string())),
        ("keyword", text(&query.keyword)),
    ];

    let mut key = TECH_JOBS.to_string();
    for (name, value) in segments {
        if let Some(value) = value {
            key.push(':');
            key.push_str(name);
            key.push(':');
            key.push_str(&value);
        }
    }
    key
}
