//! Range selection strategy chain
//!
//! Charts often default to a short visible window while holding more
//! history. Strategies run in priority order until one applies; each
//! success is followed by a settle delay so the chart can re-render. When
//! nothing applies the current range is kept.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{PageDriver, ScrapeResult};
use crate::infrastructure::chart_scripts;
use crate::infrastructure::config::{ExtractionConfig, TimingConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOutcome {
    Applied(String),
    NotApplicable,
}

#[async_trait]
pub trait RangeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Errors abort the attempt; "nothing to click" is `NotApplicable`
    async fn apply(&self, page: &dyn PageDriver) -> ScrapeResult<RangeOutcome>;
}

/// Site-specific 10-year control, clicked through the DOM
pub struct TenYearControlClick {
    selector: String,
    timeout: Duration,
}

impl TenYearControlClick {
    pub fn new(selector: impl Into<String>, timeout: Duration) -> Self {
        Self {
            selector: selector.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RangeStrategy for TenYearControlClick {
    fn name(&self) -> &'static str {
        "ten_year_control"
    }

    async fn apply(&self, page: &dyn PageDriver) -> ScrapeResult<RangeOutcome> {
        if page.click_element(&self.selector, self.timeout).await? {
            Ok(RangeOutcome::Applied("10Y".to_string()))
        } else {
            Ok(RangeOutcome::NotApplicable)
        }
    }
}

/// Highcharts range-selector buttons, by label in priority order
pub struct RangeSelectorButtons {
    script: String,
}

impl RangeSelectorButtons {
    pub fn new(labels: &[String]) -> Self {
        Self {
            script: chart_scripts::click_range_button(labels),
        }
    }
}

#[async_trait]
impl RangeStrategy for RangeSelectorButtons {
    fn name(&self) -> &'static str {
        "range_selector_buttons"
    }

    async fn apply(&self, page: &dyn PageDriver) -> ScrapeResult<RangeOutcome> {
        let chosen = page.evaluate(&self.script).await?;
        Ok(chosen
            .as_str()
            .map_or(RangeOutcome::NotApplicable, |label| {
                RangeOutcome::Applied(label.to_string())
            }))
    }
}

pub struct RangeSelector {
    strategies: Vec<Box<dyn RangeStrategy>>,
    settle: Duration,
}

impl RangeSelector {
    pub fn new(strategies: Vec<Box<dyn RangeStrategy>>, settle: Duration) -> Self {
        Self { strategies, settle }
    }

    /// 10-year control first, then `MAX` → `10Y` → `ALL` buttons
    pub fn standard(extraction: &ExtractionConfig, timing: &TimingConfig) -> Self {
        Self::new(
            vec![
                Box::new(TenYearControlClick::new(
                    extraction.ten_year_selector.clone(),
                    timing.range_control_timeout(),
                )),
                Box::new(RangeSelectorButtons::new(&extraction.range_labels)),
            ],
            timing.range_settle(),
        )
    }

    /// Label of the applied range, `None` when the current range was kept
    pub async fn select(&self, page: &dyn PageDriver) -> ScrapeResult<Option<String>> {
        for strategy in &self.strategies {
            match strategy.apply(page).await? {
                RangeOutcome::Applied(label) => {
                    info!("📅 range set to {} via {}", label, strategy.name());
                    tokio::time::sleep(self.settle).await;
                    return Ok(Some(label));
                }
                RangeOutcome::NotApplicable => debug!("range strategy {} not applicable", strategy.name()),
            }
        }
        debug!("no range control matched, keeping current range");
        Ok(None)
    }
}
