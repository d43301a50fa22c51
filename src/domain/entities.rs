//! Core data entities for the scraped time series
//!
//! `RawPoint` is what the charting runtime hands back, `Observation` is the
//! unit of a panel, `Panel` is the ordered observation table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::value_objects::{Country, Period};

/// Point read directly from the charting runtime, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

impl RawPoint {
    #[must_use]
    pub const fn new(timestamp_ms: i64, value: f64) -> Self {
        Self { timestamp_ms, value }
    }
}

/// `(entity, period, value)` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub country: Country,
    pub period: Period,
    pub value: f64,
}

impl Observation {
    #[must_use]
    pub const fn new(country: Country, period: Period, value: f64) -> Self {
        Self { country, period, value }
    }

    /// Upsert key
    #[must_use]
    pub fn key(&self) -> (&Country, Period) {
        (&self.country, self.period)
    }
}

/// Observations sorted by `(country, period)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Panel {
    observations: Vec<Observation>,
}

impl Panel {
    /// Builds a panel, sorting by `(country, period)`. The sort is stable, so
    /// rows sharing a key keep their relative order.
    #[must_use]
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| a.key().cmp(&b.key()));
        Self { observations }
    }

    /// Concatenates per-country frames into one panel
    #[must_use]
    pub fn concat<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<Observation>>,
    {
        Self::from_observations(frames.into_iter().flatten().collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[must_use]
    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }

    #[must_use]
    pub fn countries(&self) -> BTreeSet<&Country> {
        self.observations.iter().map(|o| &o.country).collect()
    }

    #[must_use]
    pub fn country_count(&self) -> usize {
        self.countries().len()
    }

    /// Rows with `period >= start`
    #[must_use]
    pub fn since(&self, start: Period) -> Self {
        Self {
            observations: self
                .observations
                .iter()
                .filter(|o| o.period >= start)
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Panel {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
