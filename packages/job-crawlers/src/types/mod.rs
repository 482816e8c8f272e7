//! Data types shared by crawlers and the orchestrator.

pub mod posting;
pub mod query;

pub use posting::{
    month_later, open_until_filled, CareerType, Company, EmploymentType, JobPosting, Location,
    Period, PostingSource, Requirements, UnknownCompany,
};
pub use query::JobQuery;
