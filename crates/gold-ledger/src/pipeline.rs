//! The per-run state machine:
//! `FETCH -> EXTRACT -> NORMALIZE -> VALIDATE -> DEDUP -> APPEND -> DONE`.
//!
//! Any stage failure ends the run with a [`PipelineError`]. The store is
//! written to exactly once, by the final append.

use crate::acquisition::http_client::HttpClient;
use crate::config::Config;
use crate::error::PipelineError;
use crate::extraction::normalize::{ensure_min_rows, normalize};
use crate::extraction::sections::SectionExtractor;
use crate::model::{PriceRow, RunTimestamp};
use crate::store::dedup::append_with_retry;
use crate::store::PriceStore;
use serde::Serialize;
use tracing::info;

/// Validated rows of one run, before persistence.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub timestamp: RunTimestamp,
    pub rows: Vec<PriceRow>,
    pub sections_found: Vec<String>,
    pub failed_sections: usize,
    /// Rows extracted from the page, before price parsing.
    pub extracted: usize,
    /// Rows skipped for shape (not exactly three cells).
    pub skipped: usize,
    /// Rows dropped for an unparseable price.
    pub dropped: usize,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub timestamp_local: String,
    pub sections: Vec<String>,
    pub failed_sections: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub valid: usize,
    pub appended: usize,
    pub duplicates: usize,
    pub wrote_header: bool,
}

/// Scrape-and-append pipeline bound to one [`Config`].
pub struct Pipeline {
    config: Config,
    fetcher: HttpClient,
    extractor: SectionExtractor,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let fetcher = HttpClient::new(&config.user_agent, config.timeout, config.fetch_retry.clone())?;
        let extractor = SectionExtractor::new(config.brands.clone(), &config.row_class);
        Ok(Self {
            config,
            fetcher,
            extractor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// FETCH through VALIDATE. The run timestamp is captured before the fetch.
    pub async fn scrape(&self) -> Result<ScrapeOutcome, PipelineError> {
        let stamp = RunTimestamp::now();
        info!(url = %self.config.url, timestamp = stamp.iso(), "starting run");
        let html = self.fetcher.fetch_page(&self.config.url).await?;
        self.process(&html, stamp)
    }

    /// EXTRACT through VALIDATE on already fetched markup.
    pub fn process(&self, html: &str, stamp: RunTimestamp) -> Result<ScrapeOutcome, PipelineError> {
        let extraction = self.extractor.extract(html);
        let extracted = extraction.rows.len();
        let normalized = normalize(extraction.rows, &stamp);
        ensure_min_rows(&normalized.rows, self.config.min_rows)?;

        Ok(ScrapeOutcome {
            timestamp: stamp,
            rows: normalized.rows,
            sections_found: extraction.sections_found,
            failed_sections: extraction.failures.len(),
            extracted,
            skipped: extraction.skipped_rows,
            dropped: normalized.dropped,
        })
    }

    /// DEDUP and APPEND under the store retry policy.
    pub async fn commit(
        &self,
        outcome: ScrapeOutcome,
        store: &dyn PriceStore,
    ) -> Result<RunReport, PipelineError> {
        let appended = append_with_retry(store, &outcome.rows, &self.config.store_retry).await?;
        info!(
            appended = appended.appended,
            duplicates = appended.duplicates,
            "run complete"
        );

        Ok(RunReport {
            timestamp: outcome.timestamp.iso().to_string(),
            timestamp_local: outcome.timestamp.local().to_string(),
            sections: outcome.sections_found,
            failed_sections: outcome.failed_sections,
            extracted: outcome.extracted,
            skipped: outcome.skipped,
            dropped: outcome.dropped,
            valid: outcome.rows.len(),
            appended: appended.appended,
            duplicates: appended.duplicates,
            wrote_header: appended.wrote_header,
        })
    }

    /// The whole run against `store`.
    pub async fn run(&self, store: &dyn PriceStore) -> Result<RunReport, PipelineError> {
        let outcome = self.scrape().await?;
        self.commit(outcome, store).await
    }
}
