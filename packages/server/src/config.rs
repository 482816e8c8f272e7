use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use job_crawlers::{HttpConfig, RenderConfig, RetryPolicy};

/// Default refresh schedule: every three hours from 09:00 to 20:00 on weekdays.
pub const DEFAULT_UPDATE_CRON: &str = "0 0 9-20/3 * * Mon-Fri";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// In-memory cache is used when unset.
    pub redis_url: Option<String>,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub api_prefix: String,
    pub jobs: JobsConfig,
    pub crawl: CrawlConfig,
    pub browser: BrowserConfig,
}

/// Refresh schedule and cache lifetime.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub cache_ttl: Duration,
    pub update_cron: String,
    pub refresh_on_startup: bool,
    pub clear_cache_on_startup: bool,
}

/// Outbound request pacing and retry settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_concurrent_requests: usize,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub requests_per_second: Option<u32>,
    pub max_pages: usize,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: Duration,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub navigation_timeout: Duration,
    pub operation_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: parsed("PORT", 3000)?,
            redis_url: optional("REDIS_URL"),
            allowed_origins: optional("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            api_prefix: normalize_prefix(
                &env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            ),
            jobs: JobsConfig {
                cache_ttl: Duration::from_secs(parsed("JOBS_CACHE_TTL", 3600)?),
                update_cron: env::var("JOBS_UPDATE_CRON")
                    .unwrap_or_else(|_| DEFAULT_UPDATE_CRON.to_string()),
                refresh_on_startup: parsed("JOBS_REFRESH_ON_STARTUP", true)?,
                clear_cache_on_startup: parsed("JOBS_CLEAR_CACHE_ON_STARTUP", false)?,
            },
            crawl: CrawlConfig {
                max_concurrent_requests: parsed("JOB_MAX_CONCURRENT_REQUESTS", 5)?,
                request_delay: millis("JOB_REQUEST_DELAY", 200)?,
                request_timeout: millis("JOB_REQUEST_TIMEOUT", 10_000)?,
                requests_per_second: optional("JOB_REQUESTS_PER_SECOND")
                    .map(|v| v.parse())
                    .transpose()
                    .context("JOB_REQUESTS_PER_SECOND must be a valid number")?,
                max_pages: parsed("JOB_MAX_PAGES", 10)?,
                max_retries: parsed("JOB_MAX_RETRIES", 3)?,
                initial_delay: millis("JOB_INITIAL_DELAY", 1000)?,
                backoff_factor: parsed("JOB_BACKOFF_FACTOR", 2.0)?,
                jitter: millis("JOB_JITTER", 300)?,
            },
            browser: BrowserConfig {
                enabled: parsed("BROWSER_ENABLED", true)?,
                navigation_timeout: millis("BROWSER_NAVIGATION_TIMEOUT", 30_000)?,
                operation_timeout: millis("BROWSER_OPERATION_TIMEOUT", 60_000)?,
                chrome_executable: optional("CHROME_EXECUTABLE").map(PathBuf::from),
            },
        })
    }
}

impl CrawlConfig {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default()
            .with_timeout(self.request_timeout)
            .with_max_concurrent_requests(self.max_concurrent_requests)
            .with_request_delay(self.request_delay)
            .with_requests_per_second(self.requests_per_second)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_initial_delay(self.initial_delay)
            .with_backoff_factor(self.backoff_factor)
            .with_jitter(self.jitter)
    }
}

impl BrowserConfig {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::default()
            .with_navigation_timeout(self.navigation_timeout)
            .with_operation_timeout(self.operation_timeout)
            .with_chrome_executable(self.chrome_executable.clone())
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn millis(key: &str, default: u64) -> Result<Duration> {
    parsed(key, default).map(Duration::from_millis)
}

/// `api/v1/` -> `/api/v1`; an empty prefix stays empty.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
