pub mod crawler;

pub use crawler::{retain_valid, JobCrawler};
