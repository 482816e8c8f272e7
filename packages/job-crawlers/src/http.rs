//! Outbound HTTP for crawlers.
//!
//! Every request carries a user agent picked at random from a fixed pool and
//! browser-like `Accept`/`Accept-Language` headers. [`run_batch`] runs a list of
//! request tasks with bounded concurrency and a per-lane cooldown.

use std::fmt::Display;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use governor::{Quota, RateLimiter};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CrawlError, CrawlResult};

pub const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7";
const ACCEPT_LANGUAGE_VALUE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Concurrency limit for [`HttpFetcher::batch`].
    pub max_concurrent_requests: usize,
    /// Cooldown each batch lane takes after finishing a task.
    pub request_delay: Duration,
    pub user_agents: Vec<String>,
    /// Optional global cap on outbound requests.
    pub requests_per_second: Option<u32>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_concurrent_requests: 5,
            request_delay: Duration::from_millis(200),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            requests_per_second: None,
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_user_agents(mut self, agents: Vec<String>) -> Self {
        self.user_agents = agents;
        self
    }

    pub fn with_requests_per_second(mut self, rps: Option<u32>) -> Self {
        self.requests_per_second = rps;
        self
    }
}

/// Shared HTTP client used by the static and JSON crawlers.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: HttpConfig,
    limiter: Option<Arc<DefaultRateLimiter>>,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> CrawlResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to create HTTP client: {}", e)))?;

        let limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Uniformly random entry of the user agent pool.
    pub fn random_user_agent(&self) -> &str {
        self.config
            .user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &str) -> CrawlResult<String> {
        let request = self.client.get(url);
        self.send(request, url).await
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CrawlResult<T> {
        let body = self.get_text(url).await?;
        decode_json(url, &body)
    }

    /// POST a JSON body to `url` and decode a JSON response.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> CrawlResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(url).json(body);
        let body = self.send(request, url).await?;
        decode_json(url, &body)
    }

    /// Run `tasks` with this fetcher's concurrency limit and request delay.
    pub async fn batch<T, E, F, Fut>(&self, tasks: Vec<F>) -> Vec<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        run_batch(
            tasks,
            self.config.max_concurrent_requests,
            self.config.request_delay,
        )
        .await
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> CrawlResult<String> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        debug!(url = %url, "HTTP request starting");
        let response = request
            .header(USER_AGENT, self.random_user_agent())
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                if e.is_timeout() {
                    CrawlError::Timeout {
                        operation: format!("request {}", url),
                        millis: self.config.timeout.as_millis() as u64,
                    }
                } else {
                    CrawlError::Http {
                        url: url.to_string(),
                        source: Box::new(e),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| CrawlError::Http {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        if body.trim().is_empty() {
            return Err(CrawlError::EmptyResponse {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}

fn decode_json<T: DeserializeOwned>(url: &str, body: &str) -> CrawlResult<T> {
    serde_json::from_str(body).map_err(|source| CrawlError::Json {
        url: url.to_string(),
        source,
    })
}

/// Run zero-argument async tasks with at most `concurrency` in flight.
///
/// Each lane sleeps `delay` after finishing a task before it picks up the
/// next one. Failed tasks are logged and dropped; successful results keep
/// their submission order.
pub async fn run_batch<T, E, F, Fut>(tasks: Vec<F>, concurrency: usize, delay: Duration) -> Vec<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total = tasks.len();
    let completed: Vec<(usize, Result<T, E>)> = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move {
            let result = task().await;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            (index, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    for (index, result) in completed {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(e) => warn!(task = index, total, error = %e, "Batch task failed"),
        }
    }

    slots.into_iter().flatten().collect()
}
