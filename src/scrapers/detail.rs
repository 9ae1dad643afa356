//! Detail page scraper.
//!
//! Candidates are processed in batches of `batch_size`; within a batch the
//! permit pool bounds how many pages load at once, and batches are separated
//! by `batch_delay_ms`. Every candidate yields exactly one [`RawRecord`]:
//! a failed page keeps the candidate's title and url with all metadata absent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::browser::{PageRenderer, RenderRequest};
use super::config::ScraperConfig;
use super::extract::{extract_record, SCORECARD};
use super::fetcher::{FetchPermits, Fetcher};
use crate::models::{Candidate, RawRecord};

pub struct DetailScraper {
    fetcher: Fetcher,
    permits: FetchPermits,
    config: ScraperConfig,
}

impl DetailScraper {
    pub fn new(fetcher: Fetcher, permits: FetchPermits, config: ScraperConfig) -> Self {
        Self {
            fetcher,
            permits,
            config,
        }
    }

    fn request(&self, candidate: &Candidate) -> RenderRequest {
        RenderRequest::new(candidate.detail_url.clone())
            .settle(Duration::from_millis(self.config.detail_settle_ms))
            .wait_for(SCORECARD, false, self.config.wait_timeout())
    }

    /// Fetch and extract every candidate, returning records in candidate order.
    pub async fn scrape(&self, candidates: &[Candidate]) -> Vec<RawRecord> {
        let batch_size = self.config.batch_size.max(1);
        let batches = candidates.len().div_ceil(batch_size);
        let mut records = Vec::with_capacity(candidates.len());
        let mut failures = 0usize;

        info!(
            "[DETAIL] Scraping {} detail pages in {} batches (concurrency {})",
            candidates.len(),
            batches,
            self.permits.limit()
        );

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_delay().is_zero() {
                tokio::time::sleep(self.config.batch_delay()).await;
            }

            let requests: Vec<RenderRequest> = batch.iter().map(|c| self.request(c)).collect();
            let outcomes = self
                .fetcher
                .fetch_all(&self.permits, &requests, self.config.detail_timeout())
                .await;

            for (candidate, outcome) in batch.iter().zip(outcomes) {
                let record = match outcome.result {
                    Ok(content) => extract_record(&content, candidate),
                    Err(e) => {
                        failures += 1;
                        warn!(
                            url = %candidate.detail_url,
                            kind = e.kind().as_str(),
                            "[DETAIL] Keeping candidate without metadata"
                        );
                        RawRecord::from_candidate(candidate)
                    }
                };
                records.push(record);
            }
            info!("[DETAIL] Batch {}/{} done", index + 1, batches);
        }

        let succeeded = candidates.len() - failures;
        let rate = if candidates.is_empty() {
            100.0
        } else {
            succeeded as f64 * 100.0 / candidates.len() as f64
        };
        info!(
            "[DETAIL] Fetched {}/{} pages ({:.1}% success)",
            succeeded,
            candidates.len(),
            rate
        );

        records
    }
}

/// Scrape details with a fresh permit pool of `concurrency_limit`.
pub async fn scrape_details(
    renderer: Arc<dyn PageRenderer>,
    candidates: &[Candidate],
    concurrency_limit: usize,
    config: &ScraperConfig,
) -> Vec<RawRecord> {
    let permits = FetchPermits::new(concurrency_limit);
    DetailScraper::new(Fetcher::new(renderer), permits, config.clone())
        .scrape(candidates)
        .await
}
