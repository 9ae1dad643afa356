//! Headless Chrome engine via chromiumoxide.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserEngineConfig, PageContent, PageRenderer, RenderRequest};
use crate::scrapers::{FetchError, ScrapeError};

/// Polling interval while waiting for a selector to appear.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// One shared Chrome session; each render opens and closes its own tab.
pub struct ChromiumRenderer {
    browser: RwLock<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a local Chrome, or connect to `remote_url` when configured.
    pub async fn launch(config: &BrowserEngineConfig) -> Result<Self, ScrapeError> {
        let (browser, mut handler) = match config.remote_url {
            Some(ref remote) => Browser::connect(remote.as_str())
                .await
                .map_err(|e| ScrapeError::Engine(format!("connect to {}: {}", remote, e)))?,
            None => {
                let chrome_config = Self::chrome_config(config)?;
                Browser::launch(chrome_config)
                    .await
                    .map_err(|e| ScrapeError::Engine(format!("launch chrome: {}", e)))?
            }
        };

        // The CDP event loop must be polled for the session to make progress.
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser: RwLock::new(browser),
            handler,
        })
    }

    fn chrome_config(config: &BrowserEngineConfig) -> Result<ChromeConfig, ScrapeError> {
        let (width, height) = config.viewport;
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", config.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        for arg in &config.chrome_args {
            builder = builder.arg(arg.clone());
        }

        builder.build().map_err(ScrapeError::Engine)
    }

    async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PageContent, FetchError> {
        // Open a blank tab first so the guard owns it before navigation starts.
        let page = {
            let browser = self.browser.read().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| FetchError::navigation(&request.url, e))?
        };
        let page = PageGuard::new(page, request.url.clone());
        page.page()
            .goto(request.url.as_str())
            .await
            .map_err(|e| FetchError::navigation(&request.url, e))?;

        if !request.settle.is_zero() {
            tokio::time::sleep(request.settle).await;
        }

        if let Some(ref wait) = request.wait_for {
            let found = Self::wait_for_selector(page.page(), &wait.selector, wait.timeout).await;
            if !found {
                if wait.required {
                    return Err(FetchError::selector_not_found(&request.url, &wait.selector));
                }
                debug!(url = %request.url, selector = %wait.selector, "Optional selector not found");
            }
        }

        let html = page
            .page()
            .content()
            .await
            .map_err(|e| FetchError::navigation(&request.url, e))?;

        page.close().await;
        Ok(PageContent::new(request.url.clone(), html))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn close(&self) {
        let mut browser = self.browser.write().await;
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        let _ = browser.wait().await;
        self.handler.abort();
    }
}

/// Closes its tab on every exit path, including timeout cancellation.
struct PageGuard {
    page: Option<Page>,
    url: String,
}

impl PageGuard {
    fn new(page: Page, url: String) -> Self {
        Self {
            page: Some(page),
            url,
        }
    }

    fn page(&self) -> &Page {
        // Only `close` and `drop` take the page, and both consume the guard.
        self.page.as_ref().unwrap_or_else(|| unreachable!("page taken before guard dropped"))
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(url = %self.url, "Failed to close page: {}", e);
            }
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let url = std::mem::take(&mut self.url);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!(url = %url, "Failed to close abandoned page: {}", e);
                    }
                });
            }
        }
    }
}
