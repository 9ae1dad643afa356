//! Page rendering engines.
//!
//! The rest of the scraper only sees [`PageRenderer`]: "render this URL,
//! optionally wait for a selector, hand back the DOM as HTML". Two engines
//! are provided:
//! - `chromium`: headless Chrome over the DevTools protocol (feature `browser`)
//! - `http`: a plain GET without script execution, for static mirrors and tests

#[cfg(feature = "browser")]
mod chromium;
mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::info;

use super::{FetchError, ScrapeError};

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;
pub use http::HttpRenderer;

/// Engine type for browser-based fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserEngineType {
    #[default]
    Chromium,
    Http,
}

impl BrowserEngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Http => "http",
        }
    }
}

/// Resolved engine settings.
#[derive(Debug, Clone)]
pub struct BrowserEngineConfig {
    pub engine: BrowserEngineType,
    pub headless: bool,
    pub remote_url: Option<String>,
    pub proxy: Option<String>,
    pub chrome_args: Vec<String>,
    pub viewport: (u32, u32),
    pub user_agent: String,
}

/// A selector to wait for after navigation.
#[derive(Debug, Clone)]
pub struct WaitFor {
    pub selector: String,
    /// When true, a selector that never appears fails the page with
    /// `SelectorNotFound`; otherwise the page is returned as rendered.
    pub required: bool,
    pub timeout: Duration,
}

/// One page load.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    /// Pause after navigation to let client-side rendering finish.
    pub settle: Duration,
    pub wait_for: Option<WaitFor>,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            settle: Duration::ZERO,
            wait_for: None,
        }
    }

    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn wait_for(mut self, selector: &str, required: bool, timeout: Duration) -> Self {
        self.wait_for = Some(WaitFor {
            selector: selector.to_string(),
            required,
            timeout,
        });
        self
    }
}

/// A rendered page's DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub html: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// A page rendering engine.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to the request URL and return the rendered DOM.
    async fn render(&self, request: &RenderRequest) -> Result<PageContent, FetchError>;

    /// Engine name for logging.
    fn name(&self) -> &'static str;

    /// Release engine resources (browser process, connections).
    async fn close(&self) {}
}

/// Check whether `html` contains at least one element matching `selector`.
/// An unparseable selector never matches.
pub fn has_selector(html: &str, selector: &str) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        return false;
    };
    Html::parse_document(html).select(&selector).next().is_some()
}

/// Apply a `WaitFor` to an already-fetched document (engines without live DOM).
pub(crate) fn check_wait(url: &str, html: &str, wait: Option<&WaitFor>) -> Result<(), FetchError> {
    match wait {
        Some(w) if !has_selector(html, &w.selector) => {
            if w.required {
                Err(FetchError::selector_not_found(url, &w.selector))
            } else {
                tracing::debug!(url, selector = %w.selector, "Optional selector not present");
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// Build the configured renderer.
pub async fn create_renderer(
    config: &BrowserEngineConfig,
) -> Result<Arc<dyn PageRenderer>, ScrapeError> {
    match config.engine {
        #[cfg(feature = "browser")]
        BrowserEngineType::Chromium => {
            let renderer = ChromiumRenderer::launch(config).await?;
            info!(engine = "chromium", "Browser renderer ready");
            Ok(Arc::new(renderer))
        }
        #[cfg(not(feature = "browser"))]
        BrowserEngineType::Chromium => {
            tracing::warn!("Built without the `browser` feature; falling back to the http engine");
            Ok(Arc::new(HttpRenderer::new(config)?))
        }
        BrowserEngineType::Http => {
            let renderer = HttpRenderer::new(config)?;
            info!(engine = "http", "HTTP renderer ready (no script execution)");
            Ok(Arc::new(renderer))
        }
    }
}
