//! Append/upsert of a fresh panel into the master panel

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::{Country, Observation, Panel, Period};

/// `master ∪ new`, keyed by `(country, period)`; new values win.
/// The result is sorted and holds each key exactly once.
pub fn merge_panels(master: Option<&Panel>, new: &Panel) -> Panel {
    let mut merged: BTreeMap<(Country, Period), f64> = BTreeMap::new();

    for obs in master.into_iter().flat_map(Panel::iter).chain(new.iter()) {
        merged.insert((obs.country.clone(), obs.period), obs.value);
    }

    Panel::from_observations(
        merged
            .into_iter()
            .map(|((country, period), value)| Observation::new(country, period, value))
            .collect(),
    )
}

/// First day of the current UTC month minus `years`
pub fn recent_window_cutoff(now: DateTime<Utc>, years: u32) -> Period {
    Period::window_start(now, years)
}

/// Advisory view: rows at or after the cutoff
pub fn recent_window(master: &Panel, cutoff: Period) -> Panel {
    master.since(cutoff)
}
