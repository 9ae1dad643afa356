//! Scraping stages: rendering, permit-gated fetching, and extraction.

pub mod browser;
pub mod config;
pub mod detail;
pub mod extract;
pub mod fetcher;
pub mod list;
pub mod testing;
pub mod url;

use thiserror::Error;

pub use browser::{create_renderer, BrowserEngineConfig, BrowserEngineType, PageContent, PageRenderer, RenderRequest};
pub use config::{BrowserConfig, ScraperConfig, DEFAULT_BASE_URL};
pub use detail::{scrape_details, DetailScraper};
pub use extract::{extract_candidates, extract_record};
pub use fetcher::{fetch_all, FetchError, FetchErrorKind, FetchOutcome, FetchPermits, Fetcher};
pub use list::{scrape_list, ListScraper};

/// Stage-level scrape failure.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Every listing page failed; the site is most likely unreachable.
    #[error("all {pages} listing pages failed to load")]
    AllPagesFailed { pages: u32 },

    #[error("browser engine error: {0}")]
    Engine(String),
}
