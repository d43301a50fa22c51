//! Scrape lifecycle states and per-country outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-attempt state machine: `Navigating → AwaitingReady → SelectingRange → Extracting`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrapeStage {
    Navigating,
    AwaitingReady,
    SelectingRange,
    Extracting,
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigating => "NAVIGATING",
            Self::AwaitingReady => "AWAITING_READY",
            Self::SelectingRange => "SELECTING_RANGE",
            Self::Extracting => "EXTRACTING",
        };
        f.write_str(name)
    }
}

/// Terminal state of one country's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CountryOutcome {
    Succeeded { rows: usize },
    /// Readiness succeeded but the chart yielded nothing usable
    NoData,
    Failed { last_error: String },
}

impl CountryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl fmt::Display for CountryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { rows } => write!(f, "ok (rows={rows})"),
            Self::NoData => f.write_str("no data"),
            Self::Failed { last_error } => write!(f, "failed: {last_error}"),
        }
    }
}
