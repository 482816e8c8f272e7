use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use job_crawlers::Company;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::kernel::{CacheError, FlightError};

/// Failures surfaced by the jobs orchestrator.
///
/// `Clone` so every caller joined on one in-flight refresh sees the outcome.
#[derive(Debug, Clone, Error)]
pub enum JobsError {
    #[error("unknown company: {0}")]
    UnknownCompany(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Source still failing after every retry
    #[error("crawl failed for {company}: {message}")]
    Crawl { company: Company, message: String },

    #[error("every job source failed")]
    AllSourcesFailed,

    /// Refresh task ended without a result
    #[error(transparent)]
    Refresh(#[from] FlightError),
}

pub type JobsResult<T> = std::result::Result<T, JobsError>;

impl IntoResponse for JobsError {
    fn into_response(self) -> Response {
        match self {
            Self::UnknownCompany(code) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("Unsupported company: {}", code) })),
            )
                .into_response(),
            other => {
                error!(error = %other, "Jobs request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to fetch job postings" })),
                )
                    .into_response()
            }
        }
    }
}
