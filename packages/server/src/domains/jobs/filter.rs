//! In-memory filtering and pagination of cached postings.

use job_crawlers::{JobPosting, JobQuery};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Conjunctive match: every filter present on `query` must hold.
pub fn matches(posting: &JobPosting, query: &JobQuery) -> bool {
    let text = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    };

    if let Some(department) = text(&query.department) {
        if !contains_ci(&posting.department, &department) {
            return false;
        }
    }
    if let Some(field) = text(&query.field) {
        if !contains_ci(&posting.field, &field) {
            return false;
        }
    }
    if query.career.is_some_and(|c| posting.requirements.career != c) {
        return false;
    }
    if query
        .employment_type
        .is_some_and(|e| posting.employment_type != e)
    {
        return false;
    }
    if query.location.is_some_and(|l| !posting.locations.contains(&l)) {
        return false;
    }
    if let Some(keyword) = text(&query.keyword) {
        let in_title = contains_ci(&posting.title, &keyword);
        let in_description = posting
            .description
            .as_deref()
            .is_some_and(|d| contains_ci(d, &keyword));
        let in_tags = posting
            .tags
            .iter()
            .flatten()
            .any(|t| contains_ci(t, &keyword));
        let in_skills = posting
            .requirements
            .skills
            .iter()
            .any(|s| contains_ci(s, &keyword));
        if !(in_title || in_description || in_tags || in_skills) {
            return false;
        }
    }
    true
}

pub fn filter_postings(postings: Vec<JobPosting>, query: &JobQuery) -> Vec<JobPosting> {
    postings.into_iter().filter(|p| matches(p, query)).collect()
}

/// Slice `[(page-1)*limit, page*limit)`; both are clamped to at least 1.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> PaginatedResponse<T> {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(limit);

    let data = items.into_iter().skip(start).take(limit).collect();

    PaginatedResponse {
        data,
        meta: PageMeta {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        },
    }
}

/// Filter, strip diagnostics payloads, and paginate.
pub fn respond(postings: Vec<JobPosting>, query: &JobQuery) -> PaginatedResponse<JobPosting> {
    let visible = filter_postings(postings, query)
        .into_iter()
        .map(|mut posting| {
            posting.raw_data = None;
            posting
        })
        .collect();
    paginate(visible, query.page(), query.limit())
}
