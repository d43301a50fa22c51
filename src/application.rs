//! Application layer module
//!
//! This module contains the scrape pipeline that orchestrates the domain
//! types over the browser and storage ports.

pub mod country_scraper;
pub mod merge;
pub mod normalizer;
pub mod pipeline;
pub mod range_selector;
pub mod readiness;

pub use country_scraper::{CountryReport, CountryScraper, RetryPolicy};
pub use merge::{merge_panels, recent_window, recent_window_cutoff};
pub use normalizer::{normalize, normalize_panel};
pub use pipeline::{CountrySummary, PipelineError, RunOutput, RunSummary, ScrapePipeline};
pub use range_selector::{RangeOutcome, RangeSelector, RangeStrategy};
pub use readiness::ReadinessDetector;
