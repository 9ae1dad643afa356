//! Permit-gated, order-preserving page fetcher.
//!
//! All page loads go through [`Fetcher::fetch`], which holds one permit from
//! a [`FetchPermits`] pool for the duration of the load. The permit is an
//! owned semaphore guard, so it is returned on success, failure, and timeout
//! alike. [`Fetcher::fetch_all`] drives a whole batch concurrently on the
//! calling task and returns outcomes in input order.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use indicatif::ProgressBar;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use super::browser::{PageContent, PageRenderer, RenderRequest};

/// Category of a per-page failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    NavigationFailed,
    SelectorNotFound,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NavigationFailed => "navigation_failed",
            Self::SelectorNotFound => "selector_not_found",
        }
    }
}

/// A single page failed to load. Never fatal for the batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out after {timeout:?} loading {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("selector `{selector}` not found on {url}")]
    SelectorNotFound { url: String, selector: String },
}

impl FetchError {
    pub fn timeout(url: &str, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.to_string(),
            timeout,
        }
    }

    pub fn navigation(url: &str, reason: impl Display) -> Self {
        Self::NavigationFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn selector_not_found(url: &str, selector: &str) -> Self {
        Self::SelectorNotFound {
            url: url.to_string(),
            selector: selector.to_string(),
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Timeout { .. } => FetchErrorKind::Timeout,
            Self::NavigationFailed { .. } => FetchErrorKind::NavigationFailed,
            Self::SelectorNotFound { .. } => FetchErrorKind::SelectorNotFound,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::NavigationFailed { url, .. }
            | Self::SelectorNotFound { url, .. } => url,
        }
    }
}

/// Bounded pool of concurrent page loads.
///
/// Cloning shares the pool; the list and detail stages use the same handle
/// so the bound holds across the whole run.
#[derive(Debug, Clone)]
pub struct FetchPermits {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl FetchPermits {
    /// Create a pool of `limit` permits (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit. Dropping the returned guard releases it.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }
}

/// Outcome of one page in a batch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub url: String,
    pub result: Result<PageContent, FetchError>,
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives page loads through a renderer under a permit pool.
#[derive(Clone)]
pub struct Fetcher {
    renderer: Arc<dyn PageRenderer>,
    progress: Option<ProgressBar>,
}

impl Fetcher {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            renderer,
            progress: None,
        }
    }

    /// Tick `progress` once per completed page.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn renderer(&self) -> &Arc<dyn PageRenderer> {
        &self.renderer
    }

    /// Load one page while holding a permit.
    ///
    /// The timeout covers the page load only, not the wait for a permit.
    pub async fn fetch(
        &self,
        permits: &FetchPermits,
        request: &RenderRequest,
        timeout: Duration,
    ) -> Result<PageContent, FetchError> {
        let _permit = permits
            .acquire()
            .await
            .ok_or_else(|| FetchError::navigation(&request.url, "fetch permit pool closed"))?;

        debug!(url = %request.url, engine = self.renderer.name(), "Loading page");
        match tokio::time::timeout(timeout, self.renderer.render(request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(&request.url, timeout)),
        }
    }

    /// Load every request, at most `permits.limit()` at a time.
    ///
    /// Returns one outcome per request, in request order.
    pub async fn fetch_all(
        &self,
        permits: &FetchPermits,
        requests: &[RenderRequest],
        timeout: Duration,
    ) -> Vec<FetchOutcome> {
        let loads = requests.iter().map(|request| async move {
            let result = self.fetch(permits, request, timeout).await;
            if let Err(ref e) = result {
                warn!(url = %request.url, kind = e.kind().as_str(), "Page fetch failed: {}", e);
            }
            if let Some(ref progress) = self.progress {
                progress.inc(1);
            }
            FetchOutcome {
                url: request.url.clone(),
                result,
            }
        });

        join_all(loads).await
    }
}

/// Fetch plain URLs with a fresh permit pool of `concurrency_limit`.
pub async fn fetch_all(
    renderer: Arc<dyn PageRenderer>,
    urls: &[String],
    concurrency_limit: usize,
    per_page_timeout: Duration,
) -> Vec<FetchOutcome> {
    let permits = FetchPermits::new(concurrency_limit);
    let requests: Vec<RenderRequest> = urls.iter().map(RenderRequest::new).collect();
    Fetcher::new(renderer)
        .fetch_all(&permits, &requests, per_page_timeout)
        .await
}
