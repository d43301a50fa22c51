//! # Domain Value Objects
//!
//! Immutable value types that represent concepts in the scraping domain.
//! Value objects are defined by their attributes rather than identity.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Target entity: one country whose series is scraped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Country(String);

impl Country {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Country {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps a country name to the site's URL path segment
///
/// Names listed in the override table are returned verbatim. Everything else
/// is trimmed, lowercased, and has its whitespace runs replaced by single
/// hyphens. No other punctuation is escaped.
#[derive(Debug, Clone, Default)]
pub struct SlugResolver {
    overrides: HashMap<String, String>,
}

impl SlugResolver {
    #[must_use]
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> String {
        if let Some(slug) = self.overrides.get(name) {
            return slug.clone();
        }
        name.split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// `base_url / slug / metric_path`
    #[must_use]
    pub fn country_url(&self, base_url: &str, metric_path: &str, country: &Country) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.resolve(country.name()),
            metric_path.trim_matches('/')
        )
    }
}

/// Calendar month, represented by its first day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(NaiveDate);

impl Period {
    /// Period containing the given date
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        // day 1 always exists
        Self(date.with_day(1).unwrap_or(date))
    }

    #[must_use]
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Period of a UTC instant given in epoch milliseconds
    #[must_use]
    pub fn from_timestamp_ms(timestamp_ms: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|dt| Self::containing(dt.date_naive()))
    }

    /// First day of the current UTC month minus `years`
    #[must_use]
    pub fn window_start(now: DateTime<Utc>, years: u32) -> Self {
        let current = Self::containing(now.date_naive());
        current
            .0
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .map_or(current, Self)
    }

    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// First instant of the month, timezone-naive
    #[must_use]
    pub fn first_instant(&self) -> NaiveDateTime {
        self.0.and_time(chrono::NaiveTime::MIN)
    }

    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.first_instant().and_utc().timestamp_millis()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
