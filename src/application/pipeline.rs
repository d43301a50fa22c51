//! Run orchestration: sequential scrape loop, reconciliation, persistence

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::country_scraper::{CountryReport, CountryScraper};
use crate::application::merge::{merge_panels, recent_window, recent_window_cutoff};
use crate::domain::{
    Country, CountryOutcome, DatasetDescriptor, Manifest, Panel, PanelRepository, SlugResolver,
};
use crate::infrastructure::config::AppConfig;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Every country failed or had no data; nothing was written
    #[error("No data extracted for any of the {attempted} target countries")]
    NoDataExtracted { attempted: usize },

    #[error("Failed to persist outputs: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Per-country line of the run summary
#[derive(Debug, Clone, Serialize)]
pub struct CountrySummary {
    pub country: Country,
    pub url: String,
    pub attempts: u32,
    pub outcome: CountryOutcome,
}

impl From<&CountryReport> for CountrySummary {
    fn from(report: &CountryReport) -> Self {
        Self {
            country: report.country.clone(),
            url: report.url.clone(),
            attempts: report.attempts,
            outcome: report.outcome.clone(),
        }
    }
}

/// Outcome of the scrape loop, before reconciliation
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub countries: Vec<CountrySummary>,
    /// Concatenation of every successful country's frame
    pub new_panel: Panel,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_reports(reports: Vec<CountryReport>, elapsed: Duration) -> Self {
        let countries = reports.iter().map(CountrySummary::from).collect();
        let new_panel = Panel::concat(reports.into_iter().map(|r| r.observations));
        Self {
            countries,
            new_panel,
            elapsed,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.countries.iter().filter(|c| c.outcome.is_success()).count()
    }

    pub fn no_data(&self) -> usize {
        self.countries
            .iter()
            .filter(|c| c.outcome == CountryOutcome::NoData)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.countries.len() - self.succeeded() - self.no_data()
    }

    pub fn log(&self) {
        info!(
            "📊 Scrape finished in {}s: {} ok, {} no data, {} failed",
            self.elapsed.as_secs(),
            self.succeeded(),
            self.no_data(),
            self.failed()
        );
        for c in &self.countries {
            match &c.outcome {
                CountryOutcome::Succeeded { .. } => info!("  {} → {} (attempts: {})", c.country, c.outcome, c.attempts),
                CountryOutcome::NoData => warn!("  {} → {}", c.country, c.outcome),
                CountryOutcome::Failed { .. } => error!("  {} → {} (attempts: {})", c.country, c.outcome, c.attempts),
            }
        }
    }
}

/// Reconciled outputs of a successful run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub summary: RunSummary,
    pub master: Panel,
    pub recent: Panel,
    pub manifest: Manifest,
}

pub struct ScrapePipeline<R> {
    scraper: CountryScraper,
    repository: R,
    countries: Vec<Country>,
    slugs: SlugResolver,
    base_url: String,
    metric_path: String,
    descriptor: DatasetDescriptor,
    politeness_delay: Duration,
    progress_every: usize,
}

impl<R> ScrapePipeline<R>
where
    R: PanelRepository,
{
    pub fn new(config: &AppConfig, scraper: CountryScraper, repository: R) -> Self {
        let countries = config.countries();
        let descriptor = DatasetDescriptor {
            dataset: config.source.dataset_name.clone(),
            source: format!("{}/", config.source.base_url.trim_end_matches('/')),
            metric_path: config.source.metric_path.clone(),
            countries: countries.clone(),
            recent_window_years: config.output.recent_window_years,
        };
        Self {
            scraper,
            repository,
            countries,
            slugs: config.slug_resolver(),
            base_url: config.source.base_url.clone(),
            metric_path: config.source.metric_path.clone(),
            descriptor,
            politeness_delay: config.timing.politeness_delay(),
            progress_every: config.timing.progress_every,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Scrape every country, then merge into the master panel and store
    pub async fn run(&self) -> Result<RunOutput, PipelineError> {
        let summary = self.scrape_all().await;
        summary.log();
        self.reconcile(summary, Utc::now())
    }

    /// Strictly sequential loop over the target list
    pub async fn scrape_all(&self) -> RunSummary {
        let total = self.countries.len();
        info!("🚀 will_process={} countries", total);
        let started = Instant::now();
        let mut reports = Vec::with_capacity(total);

        for (i, country) in self.countries.iter().enumerate() {
            let n = i + 1;
            let slug = self.slugs.resolve(country.name());
            let url = self.slugs.country_url(&self.base_url, &self.metric_path, country);
            info!("[{}/{}] {} -> {}", n, total, country, url);

            reports.push(self.scraper.scrape(country, &slug, &url).await);

            if self.progress_every > 0 && n % self.progress_every == 0 {
                info!("⏱️ progress {}/{} processed in {}s", n, total, started.elapsed().as_secs());
            }
            if n < total {
                sleep(self.politeness_delay).await;
            }
        }

        RunSummary::from_reports(reports, started.elapsed())
    }

    /// Merge the run into the master panel and write every output.
    /// Nothing is written when no country produced data.
    pub fn reconcile(&self, summary: RunSummary, now: DateTime<Utc>) -> Result<RunOutput, PipelineError> {
        if summary.new_panel.is_empty() {
            return Err(PipelineError::NoDataExtracted {
                attempted: summary.countries.len(),
            });
        }

        let previous = self.repository.load_master().map_err(storage)?;
        let master = merge_panels(previous.as_ref(), &summary.new_panel);

        let cutoff = recent_window_cutoff(now, self.descriptor.recent_window_years);
        let recent = recent_window(&master, cutoff);

        let manifest = Manifest::describe(
            &self.descriptor,
            &master,
            &recent,
            cutoff,
            self.repository.locations(),
            Uuid::new_v4(),
            now,
        );

        self.repository.store_master(&master).map_err(storage)?;
        self.repository.store_recent_window(&recent).map_err(storage)?;
        self.repository.store_manifest(&manifest).map_err(storage)?;

        info!(
            "💾 master rows={} (+{} new), recent rows={} since {}",
            master.len(),
            summary.new_panel.len(),
            recent.len(),
            cutoff
        );

        Ok(RunOutput {
            summary,
            master,
            recent,
            manifest,
        })
    }
}

fn storage<E>(e: E) -> PipelineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    PipelineError::Storage(Box::new(e))
}
