//! Stage entry points and the retrying end-to-end run.
//!
//! Each stage reads its input file and writes its output file, so the
//! stages can be driven one at a time by an external scheduler or chained
//! by [`Pipeline::run`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cleaning::{clean_with_report, CleanReport};
use crate::config::Settings;
use crate::intermediate::{self, FileError};
use crate::repository::{LoadSummary, MovieRepository, RepositoryError};
use crate::scrapers::{DetailScraper, FetchPermits, Fetcher, ListScraper, PageRenderer, ScrapeError};

/// Retry and timeout policy for [`Pipeline::run`]. A zero timeout disables it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// Bound on one attempt of the whole chain.
    pub run_timeout_secs: u64,
    /// Bound on the detail + clean stage.
    pub detail_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay_secs: 300,
            run_timeout_secs: 90 * 60,
            detail_timeout_secs: 45 * 60,
        }
    }
}

impl PipelineConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    pub fn detail_timeout(&self) -> Option<Duration> {
        (self.detail_timeout_secs > 0).then(|| Duration::from_secs(self.detail_timeout_secs))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{stage} stage timed out after {timeout:?}")]
    StageTimeout { stage: &'static str, timeout: Duration },

    #[error("run timed out after {timeout:?}")]
    RunTimeout { timeout: Duration },

    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<PipelineError>,
    },
}

/// Counts from one successful end-to-end run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub raw: usize,
    pub validated: usize,
    pub dropped: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Result of the detail + clean stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailStage {
    pub scraped: usize,
    pub report: CleanReport,
}

/// The three stages over one renderer and one permit pool.
pub struct Pipeline {
    settings: Settings,
    renderer: Arc<dyn PageRenderer>,
    permits: FetchPermits,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(settings: Settings, renderer: Arc<dyn PageRenderer>) -> Self {
        let permits = FetchPermits::new(settings.scraper.concurrency);
        Self {
            settings,
            renderer,
            permits,
            show_progress: false,
        }
    }

    /// Draw a progress bar per scrape stage.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn renderer(&self) -> &Arc<dyn PageRenderer> {
        &self.renderer
    }

    fn fetcher(&self, len: usize, label: &'static str) -> (Fetcher, ProgressBar) {
        let progress = if self.show_progress {
            let bar = ProgressBar::new(len as u64);
            let style = ProgressStyle::with_template(
                "{prefix:>8} [{bar:40.cyan/blue}] {pos}/{len} {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
            bar.set_style(style);
            bar.set_prefix(label);
            bar
        } else {
            ProgressBar::hidden()
        };
        let fetcher = Fetcher::new(self.renderer.clone()).with_progress(progress.clone());
        (fetcher, progress)
    }

    /// Listing pages -> `movies_raw.csv`. Returns the candidate count.
    pub async fn scrape_list(&self) -> Result<usize, PipelineError> {
        let scraper_config = &self.settings.scraper;
        let (fetcher, progress) = self.fetcher(scraper_config.page_count as usize, "list");
        let scraper = ListScraper::new(fetcher, self.permits.clone(), scraper_config.clone());

        let candidates = scraper
            .scrape(scraper_config.page_count, &scraper_config.base_url)
            .await;
        progress.finish_and_clear();
        let candidates = candidates?;

        let path = self.settings.raw_path();
        intermediate::write_candidates(&path, &candidates)?;
        info!(path = %path.display(), "[LIST] Wrote {} candidates", candidates.len());
        Ok(candidates.len())
    }

    /// `movies_raw.csv` -> detail pages -> clean -> `movies_clean.csv`.
    ///
    /// `limit` processes only the first N candidates.
    pub async fn scrape_details(&self, limit: Option<usize>) -> Result<DetailStage, PipelineError> {
        let mut candidates = intermediate::read_candidates(&self.settings.raw_path())?;
        if let Some(limit) = limit {
            if candidates.len() > limit {
                info!("[DETAIL] Test mode: limiting to {} of {} candidates", limit, candidates.len());
                candidates.truncate(limit);
            }
        }

        let (fetcher, progress) = self.fetcher(candidates.len(), "detail");
        let scraper = DetailScraper::new(fetcher, self.permits.clone(), self.settings.scraper.clone());
        let raw = scraper.scrape(&candidates).await;
        progress.finish_and_clear();

        let (records, report) = clean_with_report(&raw);
        for (field, populated) in report.completeness.entries() {
            info!("[CLEAN] {:<18} {}/{}", field, populated, report.output);
        }

        let path = self.settings.clean_path();
        intermediate::write_records(&path, &records)?;
        info!(path = %path.display(), "[CLEAN] Wrote {} records", records.len());
        Ok(DetailStage {
            scraped: raw.len(),
            report,
        })
    }

    /// `movies_clean.csv` -> `movies` table.
    pub fn load(&self) -> Result<LoadSummary, PipelineError> {
        load_stage(&self.settings)
    }

    async fn run_once(&self, limit: Option<usize>) -> Result<RunSummary, PipelineError> {
        let candidates = self.scrape_list().await?;

        let details = match self.settings.pipeline.detail_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.scrape_details(limit))
                .await
                .map_err(|_| PipelineError::StageTimeout {
                    stage: "detail",
                    timeout,
                })??,
            None => self.scrape_details(limit).await?,
        };

        let loaded = self.load()?;
        Ok(RunSummary {
            candidates,
            raw: details.scraped,
            validated: details.report.output,
            dropped: details.report.dropped,
            duplicates: details.report.duplicates,
            inserted: loaded.inserted,
            updated: loaded.updated,
            failed: loaded.failed,
            ..Default::default()
        })
    }

    async fn attempt(&self, limit: Option<usize>) -> Result<RunSummary, PipelineError> {
        match self.settings.pipeline.run_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.run_once(limit))
                .await
                .map_err(|_| PipelineError::RunTimeout { timeout })?,
            None => self.run_once(limit).await,
        }
    }

    /// Run list -> details + clean -> load, retrying the whole chain on failure.
    pub async fn run(&self, limit: Option<usize>) -> Result<RunSummary, PipelineError> {
        let policy = &self.settings.pipeline;
        let attempts = policy.retries + 1;
        let started = Instant::now();
        let started_at = Utc::now();

        let mut attempt = 1;
        loop {
            info!("[RUN] Attempt {}/{}", attempt, attempts);
            match self.attempt(limit).await {
                Ok(mut summary) => {
                    summary.attempts = attempt;
                    summary.started_at = started_at;
                    summary.elapsed = started.elapsed();
                    info!(
                        "[RUN] Done in {:.1}s: {} candidates, {} validated, {} inserted, {} updated, {} failed",
                        summary.elapsed.as_secs_f64(),
                        summary.candidates,
                        summary.validated,
                        summary.inserted,
                        summary.updated,
                        summary.failed
                    );
                    return Ok(summary);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "[RUN] Attempt {} failed: {}; retrying in {}s",
                        attempt,
                        e,
                        policy.retry_delay_secs
                    );
                    tokio::time::sleep(policy.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("[RUN] Attempt {} failed: {}", attempt, e);
                    return Err(PipelineError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}

/// Load stage without a renderer.
pub fn load_stage(settings: &Settings) -> Result<LoadSummary, PipelineError> {
    let rows = intermediate::read_movie_rows(&settings.clean_path())?;
    info!("[LOAD] Loading {} records into {}", rows.len(), settings.database_path().display());
    let repo = MovieRepository::new(&settings.database_path())?;
    Ok(repo.load_rows(&rows)?)
}
