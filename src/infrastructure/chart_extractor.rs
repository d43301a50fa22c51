//! Highcharts-backed implementation of the `SeriesExtractor` port

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{PageDriver, RawPoint, ScrapeError, ScrapeResult, SeriesExtractor};
use crate::infrastructure::chart_scripts;
use crate::infrastructure::config::ExtractionConfig;

/// Runs the extraction script through any `PageDriver`
pub struct ChartSeriesExtractor {
    page: Arc<dyn PageDriver>,
    script: String,
}

impl ChartSeriesExtractor {
    pub fn new(page: Arc<dyn PageDriver>, config: &ExtractionConfig) -> Self {
        Self {
            page,
            script: chart_scripts::extract_series(config.point_cap, config.cap_policy),
        }
    }
}

#[async_trait]
impl SeriesExtractor for ChartSeriesExtractor {
    async fn extract_raw_points(&self) -> ScrapeResult<Vec<RawPoint>> {
        let payload = self.page.evaluate(&self.script).await?;
        let points = decode_points(&payload)?;
        debug!("extracted {} raw points", points.len());
        Ok(points)
    }
}

/// Decodes `[[x, y], ...]`. `null` counts as empty; pairs with a non-finite
/// member are dropped.
pub fn decode_points(payload: &Value) -> ScrapeResult<Vec<RawPoint>> {
    let items = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(ScrapeError::invalid_payload(format!(
                "expected an array of pairs, got {other}"
            )));
        }
    };

    let mut points = Vec::with_capacity(items.len());
    for item in items {
        let pair = item
            .as_array()
            .filter(|p| p.len() == 2)
            .ok_or_else(|| ScrapeError::invalid_payload(format!("malformed pair {item}")))?;

        let (Some(x), Some(y)) = (pair[0].as_f64(), pair[1].as_f64()) else {
            continue;
        };
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        points.push(RawPoint::new(x.round() as i64, y));
    }

    Ok(points)
}
