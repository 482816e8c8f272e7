//! Headless browser lifecycle for listings that only exist after scripts run.
//!
//! [`BrowserService`] owns at most one Chromium process. It is launched on the
//! first [`BrowserService::create_page`] call and relaunched on demand after the
//! CDP connection drops. Callers own navigation and extraction inside the page
//! and hand it back with [`BrowserService::close_page`].

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CrawlError, CrawlResult};

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Launch and page settings for [`BrowserService`].
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub operation_timeout: Duration,
    pub launch_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_millis(30_000),
            operation_timeout: Duration::from_millis(60_000),
            launch_timeout: Duration::from_millis(60_000),
            chrome_executable: None,
            extra_args: vec![
                "--disable-setuid-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-accelerated-2d-canvas".to_string(),
                "--no-first-run".to_string(),
                "--no-zygote".to_string(),
            ],
        }
    }
}

impl RenderConfig {
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.chrome_executable = path;
        self
    }

    fn launch_config(&self) -> CrawlResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(self.viewport_width, self.viewport_height)
            .request_timeout(self.operation_timeout)
            .launch_timeout(self.launch_timeout)
            .args(self.extra_args.clone());

        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(CrawlError::Config)
    }
}

struct RunningBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

/// Owner of the shared headless browser.
pub struct BrowserService {
    config: RenderConfig,
    running: Mutex<Option<RunningBrowser>>,
    shut_down: AtomicBool,
}

impl BrowserService {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// True while a launched browser still has a live CDP connection.
    pub async fn is_connected(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| r.connected.load(Ordering::SeqCst))
    }

    async fn launch(&self) -> CrawlResult<RunningBrowser> {
        info!("Launching headless browser");
        let (browser, mut handler) = Browser::launch(self.config.launch_config()?)
            .await
            .map_err(browser_error)?;

        let connected = Arc::new(AtomicBool::new(true));
        let on_disconnect = connected.clone();
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
            on_disconnect.store(false, Ordering::SeqCst);
            warn!("Headless browser disconnected");
        });

        Ok(RunningBrowser {
            browser,
            handler,
            connected,
        })
    }

    /// Open a fresh page with the fixed viewport and desktop user agent.
    pub async fn create_page(&self) -> CrawlResult<RenderPage> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(CrawlError::BrowserUnavailable);
        }

        let page = {
            let mut running = self.running.lock().await;

            if running
                .as_ref()
                .is_some_and(|r| !r.connected.load(Ordering::SeqCst))
            {
                if let Some(stale) = running.take() {
                    stale.handler.abort();
                }
            }

            if running.is_none() {
                *running = Some(self.launch().await?);
            }

            let browser = &running
                .as_ref()
                .ok_or(CrawlError::BrowserUnavailable)?
                .browser;
            with_timeout(
                "open page",
                self.config.operation_timeout,
                browser.new_page("about:blank"),
            )
            .await?
        };

        page.set_user_agent(self.config.user_agent.as_str())
            .await
            .map_err(browser_error)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            self.config.viewport_width as i64,
            self.config.viewport_height as i64,
            1.0,
            false,
        ))
        .await
        .map_err(browser_error)?;

        Ok(RenderPage {
            page: Some(page),
            navigation_timeout: self.config.navigation_timeout,
            operation_timeout: self.config.operation_timeout,
        })
    }

    /// Close a page obtained from [`create_page`](Self::create_page).
    pub async fn close_page(&self, page: RenderPage) {
        page.close().await;
    }

    /// Drop the current browser so the next page request relaunches it.
    pub async fn invalidate(&self) {
        let stale = self.running.lock().await.take();
        if let Some(stale) = stale {
            discard(stale).await;
        }
    }

    /// Check the browser after a failed page operation. A browser whose CDP
    /// connection dropped or that no longer answers a version probe is
    /// invalidated. Returns whether it was.
    pub async fn recover(&self) -> bool {
        let stale = {
            let mut running = self.running.lock().await;
            let responsive = match running.as_ref() {
                None => return false,
                Some(r) if !r.connected.load(Ordering::SeqCst) => false,
                Some(r) => tokio::time::timeout(PROBE_TIMEOUT, r.browser.version())
                    .await
                    .is_ok_and(|version| version.is_ok()),
            };
            if responsive {
                return false;
            }
            running.take()
        };

        warn!("Headless browser unresponsive; relaunching on next use");
        if let Some(stale) = stale {
            discard(stale).await;
        }
        true
    }

    /// Close the browser. Later calls are no-ops and no new pages are handed out.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(mut running) = self.running.lock().await.take() else {
            return;
        };

        info!("Closing headless browser");
        if let Err(e) = running.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = running.browser.wait().await {
            debug!(error = %e, "Browser process wait failed");
        }
        running.handler.abort();
    }
}

/// One isolated browser tab.
///
/// Closing is explicit through [`BrowserService::close_page`]; a page that is
/// dropped while still open is closed in the background.
pub struct RenderPage {
    page: Option<Page>,
    navigation_timeout: Duration,
    operation_timeout: Duration,
}

impl RenderPage {
    fn page(&self) -> CrawlResult<&Page> {
        self.page.as_ref().ok_or(CrawlError::BrowserUnavailable)
    }

    pub async fn goto(&self, url: &str) -> CrawlResult<()> {
        let page = self.page()?;
        with_timeout("navigation", self.navigation_timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), CdpError>(())
        })
        .await
    }

    /// Poll until `selector` matches or the operation timeout elapses.
    pub async fn wait_for_selector(&self, selector: &str) -> CrawlResult<()> {
        let page = self.page()?;
        let wait = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(self.operation_timeout, wait)
            .await
            .map_err(|_| CrawlError::Timeout {
                operation: format!("wait for {}", selector),
                millis: self.operation_timeout.as_millis() as u64,
            })
    }

    pub async fn scroll_to_bottom(&self) -> CrawlResult<()> {
        let page = self.page()?;
        with_timeout(
            "scroll",
            self.operation_timeout,
            page.evaluate("window.scrollTo(0, document.body.scrollHeight)"),
        )
        .await
        .map(|_| ())
    }

    /// Serialized DOM after scripts have run.
    pub async fn content(&self) -> CrawlResult<String> {
        let page = self.page()?;
        with_timeout("read content", self.operation_timeout, page.content()).await
    }

    /// Close the tab. No-op if it is already closed.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Failed to close page");
            }
        }
    }
}

impl Drop for RenderPage {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!(error = %e, "Background page close failed");
                    }
                });
            }
        }
    }
}

async fn discard(mut stale: RunningBrowser) {
    if let Err(e) = stale.browser.close().await {
        debug!(error = %e, "Closing invalidated browser failed");
    }
    stale.handler.abort();
}

fn browser_error(e: CdpError) -> CrawlError {
    CrawlError::Browser(Box::new(e))
}

async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> CrawlResult<T>
where
    F: Future<Output = Result<T, CdpError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(browser_error),
        Err(_) => Err(CrawlError::Timeout {
            operation: operation.to_string(),
            millis: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render_config() {
        let config = RenderConfig::default();
        assert_eq!((config.viewport_width, config.viewport_height), (1920, 1080));
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn shutdown_without_launch_is_idempotent() {
        let service = BrowserService::new(RenderConfig::default());
        assert!(!service.is_connected().await);

        service.shutdown().await;
        service.shutdown().await;

        assert!(matches!(
            service.create_page().await,
            Err(CrawlError::BrowserUnavailable)
        ));
    }

    #[tokio::test]
    async fn recover_without_a_browser_is_a_noop() {
        let service = BrowserService::new(RenderConfig::default());
        assert!(!service.recover().await);
        service.invalidate().await;
        assert!(!service.is_connected().await);
    }

    async fn connection_flag(service: &BrowserService) -> Arc<AtomicBool> {
        let running = service.running.lock().await;
        running.as_ref().map(|r| r.connected.clone()).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires Chrome"]
    async fn flagged_disconnect_relaunches_on_next_page() {
        let service = BrowserService::new(RenderConfig::default());
        service.close_page(service.create_page().await.unwrap()).await;
        let first = connection_flag(&service).await;

        first.store(false, Ordering::SeqCst);
        assert!(!service.is_connected().await);

        service.close_page(service.create_page().await.unwrap()).await;
        let second = connection_flag(&service).await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(service.is_connected().await);

        service.shutdown().await;
    }

    #[tokio::test]
    #[ignore = "requires Chrome"]
    async fn recover_invalidates_a_dropped_connection() {
        let service = BrowserService::new(RenderConfig::default());
        service.close_page(service.create_page().await.unwrap()).await;

        assert!(!service.recover().await, "live browser is kept");

        connection_flag(&service).await.store(false, Ordering::SeqCst);
        assert!(service.recover().await);
        assert!(service.running.lock().await.is_none());

        service.close_page(service.create_page().await.unwrap()).await;
        assert!(service.is_connected().await);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn closing_a_closed_page_is_a_noop() {
        let page = RenderPage {
            page: None,
            navigation_timeout: Duration::from_secs(1),
            operation_timeout: Duration::from_secs(1),
        };
        assert!(matches!(
            page.content().await,
            Err(CrawlError::BrowserUnavailable)
        ));
        page.close().await;
    }
}
