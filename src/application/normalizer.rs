//! Raw chart points → month-aligned observations

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::{Country, Observation, Panel, Period, RawPoint};

/// Converts one country's raw points into observations.
///
/// Points with an out-of-range timestamp or a non-finite value are dropped,
/// as are exact `(timestamp, value)` duplicates. The remainder is sorted by
/// its full UTC timestamp, truncated to the month, and reduced to one row per
/// month: the chronologically last point of the month wins.
pub fn normalize(country: &Country, points: &[RawPoint]) -> Vec<Observation> {
    let mut seen = HashSet::new();
    let mut dated: Vec<(NaiveDateTime, f64)> = points
        .iter()
        .filter(|p| p.value.is_finite())
        .filter_map(|p| {
            DateTime::<Utc>::from_timestamp_millis(p.timestamp_ms).map(|dt| (dt.naive_utc(), p.value))
        })
        .filter(|(at, value)| seen.insert((*at, canonical_bits(*value))))
        .collect();

    dated.sort_by_key(|(at, _)| *at);

    let mut by_month: BTreeMap<Period, f64> = BTreeMap::new();
    for (at, value) in dated {
        by_month.insert(Period::containing(at.date()), value);
    }

    by_month
        .into_iter()
        .map(|(period, value)| Observation::new(country.clone(), period, value))
        .collect()
}

/// Re-normalizes an existing panel: one row per `(country, period)`, the
/// later row of a key wins
pub fn normalize_panel(panel: &Panel) -> Panel {
    let mut by_key: BTreeMap<(Country, Period), f64> = BTreeMap::new();
    for obs in panel {
        if obs.value.is_finite() {
            by_key.insert((obs.country.clone(), obs.period), obs.value);
        }
    }
    Panel::from_observations(
        by_key
            .into_iter()
            .map(|((country, period), value)| Observation::new(country, period, value))
            .collect(),
    )
}

// -0.0 and 0.0 are the same observation
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ts;
    use chrono::NaiveDate;

    fn chile() -> Country {
        Country::new("Chile")
    }

    #[test]
    fn test_later_point_in_same_month_wins() {
        let points = [
            RawPoint::new(ts(2020, 1, 1), 10.5),
            RawPoint::new(ts(2020, 1, 1), 11.0),
            RawPoint::new(ts(2020, 2, 1), 12.0),
        ];
        let rows = normalize(&chile(), &points);
        let got: Vec<_> = rows.iter().map(|o| (o.period.to_string(), o.value)).collect();
        assert_eq!(
            got,
            vec![("2020-01-01".to_string(), 11.0), ("2020-02-01".to_string(), 12.0)]
        );
    }

    #[test]
    fn test_chronological_order_decides_not_input_order() {
        let points = [
            RawPoint::new(ts(2020, 3, 28), 9.0),
            RawPoint::new(ts(2020, 3, 2), 1.0),
        ];
        let rows = normalize(&chile(), &points);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 9.0);
        assert_eq!(rows[0].period, Period::from_ym(2020, 3).unwrap());
    }

    #[test]
    fn test_same_day_points_ordered_by_time_of_day() {
        let at = |hour| {
            NaiveDate::from_ymd_opt(2020, 1, 31)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap()
                .and_utc()
                .timestamp_millis()
        };
        let points = [RawPoint::new(at(10), 99.0), RawPoint::new(at(8), 1.0)];

        let rows = normalize(&chile(), &points);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period, Period::from_ym(2020, 1).unwrap());
        assert_eq!(rows[0].value, 99.0);
    }

    #[test]
    fn test_same_value_at_different_times_is_not_a_duplicate() {
        let morning = ts(2020, 5, 3);
        let points = [
            RawPoint::new(morning + 7_200_000, 5.0),
            RawPoint::new(morning + 3_600_000, 7.0),
            RawPoint::new(morning, 5.0),
        ];
        let rows = normalize(&chile(), &points);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 5.0);
    }

    #[test]
    fn test_drops_non_finite_and_out_of_range() {
        let points = [
            RawPoint::new(ts(2021, 5, 1), f64::NAN),
            RawPoint::new(ts(2021, 6, 1), f64::INFINITY),
            RawPoint::new(i64::MAX, 3.0),
            RawPoint::new(ts(2021, 7, 1), 4.0),
        ];
        let rows = normalize(&chile(), &points);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 4.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize(&chile(), &[]).is_empty());
    }

    #[test]
    fn test_normalize_panel_is_identity_on_clean_panel() {
        let panel = Panel::from_observations(normalize(
            &chile(),
            &[RawPoint::new(ts(2019, 1, 1), 1.0), RawPoint::new(ts(2019, 2, 1), 2.0)],
        ));
        assert_eq!(normalize_panel(&panel), panel);
    }
}
