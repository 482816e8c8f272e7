// Tech Jobs Aggregator - API Core
//
// Crawls Korean tech company careers sites on a schedule, caches the
// normalized postings, and serves them through a filtered, paginated read API.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
