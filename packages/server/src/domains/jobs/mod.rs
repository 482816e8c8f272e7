pub mod cache_keys;
pub mod error;
pub mod filter;
pub mod service;

pub use error::{JobsError, JobsResult};
pub use filter::{PageMeta, PaginatedResponse};
pub use service::{CompanyInfo, JobsService, RefreshReport};
