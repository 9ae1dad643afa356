//! Listing page scraper: paginates and collects detail-page candidates.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::browser::{PageRenderer, RenderRequest};
use super::config::{list_page_url, ScraperConfig};
use super::extract::{extract_candidates, MOVIE_LINK};
use super::fetcher::{FetchPermits, Fetcher};
use super::url::normalize_title;
use super::ScrapeError;
use crate::models::Candidate;

/// Collects candidates across listing pages `0..page_count`.
pub struct ListScraper {
    fetcher: Fetcher,
    permits: FetchPermits,
    config: ScraperConfig,
}

impl ListScraper {
    pub fn new(fetcher: Fetcher, permits: FetchPermits, config: ScraperConfig) -> Self {
        Self {
            fetcher,
            permits,
            config,
        }
    }

    fn request(&self, url: String) -> RenderRequest {
        RenderRequest::new(url)
            .settle(Duration::from_millis(self.config.list_settle_ms))
            .wait_for(MOVIE_LINK, true, self.config.wait_timeout())
    }

    /// Scrape `page_count` listing pages built from `base_url_template`.
    ///
    /// Candidates are deduplicated by detail url (and by normalized title
    /// when `dedup_titles` is set) and keep first-appearance order, pages
    /// taken in page order. Fails only when every page failed.
    pub async fn scrape(
        &self,
        page_count: u32,
        base_url_template: &str,
    ) -> Result<Vec<Candidate>, ScrapeError> {
        if page_count == 0 {
            info!("[LIST] No listing pages configured");
            return Ok(Vec::new());
        }

        let requests: Vec<RenderRequest> = (0..page_count)
            .map(|page| self.request(list_page_url(base_url_template, page)))
            .collect();

        info!(
            "[LIST] Scraping {} listing pages (concurrency {})",
            page_count,
            self.permits.limit()
        );
        let outcomes = self
            .fetcher
            .fetch_all(&self.permits, &requests, self.config.list_timeout())
            .await;

        let mut seen_urls = HashSet::new();
        let mut seen_titles = HashSet::new();
        let mut candidates = Vec::new();
        let mut failed_pages = 0u32;

        for (page, outcome) in outcomes.into_iter().enumerate() {
            let content = match outcome.result {
                Ok(content) => content,
                Err(e) => {
                    failed_pages += 1;
                    warn!(url = %outcome.url, page, "[LIST] Page skipped: {}", e);
                    continue;
                }
            };

            let found = extract_candidates(&content);
            let mut added = 0usize;
            for candidate in found.iter() {
                if seen_urls.contains(&candidate.detail_url) {
                    continue;
                }
                if self.config.dedup_titles {
                    let key = normalize_title(&candidate.title);
                    if !key.is_empty() && !seen_titles.insert(key) {
                        debug!(url = %candidate.detail_url, title = %candidate.title, "[LIST] Duplicate title skipped");
                        continue;
                    }
                }
                seen_urls.insert(candidate.detail_url.clone());
                candidates.push(candidate.clone());
                added += 1;
            }
            info!(
                url = %outcome.url,
                "[LIST] Page {}: {} links, {} new",
                page,
                found.len(),
                added
            );
        }

        if failed_pages == page_count {
            return Err(ScrapeError::AllPagesFailed { pages: page_count });
        }

        info!(
            "[LIST] Collected {} unique candidates ({} of {} pages failed)",
            candidates.len(),
            failed_pages,
            page_count
        );
        Ok(candidates)
    }
}

/// Scrape listing pages with a fresh permit pool of `config.concurrency`.
pub async fn scrape_list(
    renderer: Arc<dyn PageRenderer>,
    page_count: u32,
    base_url_template: &str,
    config: &ScraperConfig,
) -> Result<Vec<Candidate>, ScrapeError> {
    let permits = FetchPermits::new(config.concurrency);
    ListScraper::new(Fetcher::new(renderer), permits, config.clone())
        .scrape(page_count, base_url_template)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::{ScriptedPage, ScriptedRenderer};

    const BASE: &str = "https://movies.test/browse?page=";

    fn listing(links: &[(&str, &str)]) -> String {
        let body: String = links
            .iter()
            .map(|(href, title)| format!(r#"<a href="{}"><span class="p--small">{}</span></a>"#, href, title))
            .collect();
        format!("<html><body>{}</body></html>", body)
    }

    fn fast_config() -> ScraperConfig {
        ScraperConfig {
            list_settle_ms: 0,
            wait_timeout: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_scrape_list_dedups_across_pages() {
        let renderer = Arc::new(
            ScriptedRenderer::new()
                .page(
                    format!("{}0", BASE),
                    ScriptedPage::html(listing(&[("/m/heat", "Heat"), ("/m/alien", "Alien")])),
                )
                .page(
                    format!("{}1", BASE),
                    ScriptedPage::html(listing(&[("/m/alien/", "Alien"), ("/m/up", "Up")])),
                ),
        );

        let candidates = scrape_list(renderer, 2, BASE, &fast_config()).await.unwrap();
        let urls: Vec<&str> = candidates.iter().map(|c| c.detail_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://movies.test/m/heat",
                "https://movies.test/m/alien",
                "https://movies.test/m/up",
            ]
        );
    }

    #[tokio::test]
    async fn test_title_dedup_is_configurable() {
        let page = listing(&[("/m/heat_1995", "Heat"), ("/m/heat_2013", "HEAT")]);
        let make = || {
            Arc::new(ScriptedRenderer::new().page(format!("{}0", BASE), ScriptedPage::html(page.clone())))
        };

        let deduped = scrape_list(make(), 1, BASE, &fast_config()).await.unwrap();
        assert_eq!(deduped.len(), 1);

        let config = ScraperConfig {
            dedup_titles: false,
            ..fast_config()
        };
        let all = scrape_list(make(), 1, BASE, &config).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let renderer = Arc::new(
            ScriptedRenderer::new()
                .page(format!("{}0", BASE), ScriptedPage::navigation_error("net::ERR_FAILED"))
                .page(format!("{}1", BASE), ScriptedPage::html(listing(&[("/m/up", "Up")])))
                // no movie links: required wait fails
                .page(format!("{}2", BASE), ScriptedPage::html("<p>captcha</p>")),
        );

        let candidates = scrape_list(renderer, 3, BASE, &fast_config()).await.unwrap();
        assert_eq!(candidates, vec![Candidate::new("Up", "https://movies.test/m/up")]);
    }

    #[tokio::test]
    async fn test_all_pages_failed_is_fatal() {
        let renderer = Arc::new(ScriptedRenderer::new());
        let err = scrape_list(renderer, 2, BASE, &fast_config()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::AllPagesFailed { pages: 2 }));
    }

    #[tokio::test]
    async fn test_zero_pages_is_empty() {
        let renderer = Arc::new(ScriptedRenderer::new());
        let candidates = scrape_list(renderer.clone(), 0, BASE, &fast_config()).await.unwrap();
        assert!(candidates.is_empty());
        assert_eq!(renderer.calls(), 0);
    }
}
