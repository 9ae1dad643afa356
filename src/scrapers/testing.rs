//! Scripted page renderer for exercising the scrapers without a browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::browser::{check_wait, PageContent, PageRenderer, RenderRequest};
use super::FetchError;

/// Scripted response for one URL.
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    response: Result<String, String>,
    delay: Duration,
}

impl ScriptedPage {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            response: Ok(html.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn navigation_error(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

/// Renderer serving canned HTML per URL, recording concurrency and completion order.
///
/// Unknown URLs fail with `NavigationFailed`. Wait selectors are checked
/// against the canned HTML, like the static HTTP engine does.
#[derive(Default)]
pub struct ScriptedRenderer {
    pages: HashMap<String, ScriptedPage>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    completed: Mutex<Vec<String>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, page: ScriptedPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// Highest number of renders observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total render calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs in the order their renders finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PageContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let Some(page) = self.pages.get(&request.url) else {
            return Err(FetchError::navigation(&request.url, "no such page"));
        };

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        if let Ok(mut completed) = self.completed.lock() {
            completed.push(request.url.clone());
        }

        match page.response {
            Ok(ref html) => {
                check_wait(&request.url, html, request.wait_for.as_ref())?;
                Ok(PageContent::new(request.url.clone(), html.clone()))
            }
            Err(ref reason) => Err(FetchError::navigation(&request.url, reason)),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
