//! Descriptive record of a reconciled dataset
//!
//! Purely informative: regenerated every run from the panels it describes
//! and never read back by the pipeline.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::entities::Panel;
use super::value_objects::{Country, Period};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub dataset: String,
    pub source: String,
    pub metric_path: String,
    pub run_id: Uuid,
    pub generated_utc: DateTime<Utc>,
    pub row_count_master: usize,
    pub row_count_recent: usize,
    pub country_count: usize,
    pub files: BTreeMap<String, String>,
    pub countries: Vec<Country>,
    pub recent_window_years: u32,
    pub recent_cutoff_utc: NaiveDateTime,
}

/// Static facts about the dataset that the panels do not carry
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    pub dataset: String,
    pub source: String,
    pub metric_path: String,
    pub countries: Vec<Country>,
    pub recent_window_years: u32,
}

impl Manifest {
    #[must_use]
    pub fn describe(
        descriptor: &DatasetDescriptor,
        master: &Panel,
        recent: &Panel,
        cutoff: Period,
        files: BTreeMap<String, String>,
        run_id: Uuid,
        generated_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            dataset: descriptor.dataset.clone(),
            source: descriptor.source.clone(),
            metric_path: descriptor.metric_path.clone(),
            run_id,
            generated_utc,
            row_count_master: master.len(),
            row_count_recent: recent.len(),
            country_count: master.country_count(),
            files,
            countries: descriptor.countries.clone(),
            recent_window_years: descriptor.recent_window_years,
            recent_cutoff_utc: cutoff.first_instant(),
        }
    }
}
