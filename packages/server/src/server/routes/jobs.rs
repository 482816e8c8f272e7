//! Job posting read endpoints.
//!
//! GET {prefix}/jobs             supported-source catalog and last refresh time
//! GET {prefix}/jobs/all         postings across every source
//! GET {prefix}/jobs/:company    postings for one source (404 when unsupported)
//!
//! Listing endpoints accept `department, field, career, employmentType,
//! location, keyword, page, limit` query parameters.

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::{DateTime, Utc};
use job_crawlers::{JobPosting, JobQuery};
use serde::Serialize;

use crate::domains::jobs::{CompanyInfo, JobsResult, PaginatedResponse};
use crate::server::app::AxumAppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub companies: Vec<CompanyInfo>,
    pub last_updated: Option<DateTime<Utc>>,
}

pub async fn catalog_handler(
    Extension(state): Extension<AxumAppState>,
) -> JobsResult<Json<CatalogResponse>> {
    Ok(Json(CatalogResponse {
        companies: state.deps.jobs.supported_companies(),
        last_updated: state.deps.jobs.last_updated().await?,
    }))
}

pub async fn tech_jobs_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<JobQuery>,
) -> JobsResult<Json<PaginatedResponse<JobPosting>>> {
    state.deps.jobs.get_tech_jobs(query).await.map(Json)
}

pub async fn company_jobs_handler(
    Extension(state): Extension<AxumAppState>,
    Path(company): Path<String>,
    Query(query): Query<JobQuery>,
) -> JobsResult<Json<PaginatedResponse<JobPosting>>> {
    state
        .deps
        .jobs
        .get_company_tech_jobs(&company, query)
        .await
        .map(Json)
}
