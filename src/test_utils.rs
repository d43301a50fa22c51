//! Test utilities for the scraper
//!
//! Scripted fakes for the browser ports, so pipeline tests run without a
//! browser and with deterministic timing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::{PageDriver, RawPoint, ScrapeError, ScrapeResult, SeriesExtractor};
use crate::infrastructure::chart_scripts;

/// Page whose behaviour is fixed up front
pub struct FakePage {
    /// Readiness polls answered `false` before the first `true`; `None` never becomes ready
    ready_after: Option<usize>,
    ready_polls: AtomicUsize,
    ten_year_control: bool,
    range_button: Option<String>,
    series: Value,
    source: String,
    navigation_failures: AtomicUsize,
    source_failures: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    clicks: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            ready_after: Some(0),
            ready_polls: AtomicUsize::new(0),
            ten_year_control: false,
            range_button: None,
            series: Value::Null,
            source: "<html><body><div id=\"chart\"></div></body></html>".to_string(),
            navigation_failures: AtomicUsize::new(0),
            source_failures: AtomicUsize::new(0),
            navigations: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, series: Value) -> Self {
        self.series = series;
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn ready_after(mut self, polls: usize) -> Self {
        self.ready_after = Some(polls);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    pub fn with_ten_year_control(mut self) -> Self {
        self.ten_year_control = true;
        self
    }

    pub fn with_range_button(mut self, label: &str) -> Self {
        self.range_button = Some(label.to_string());
        self
    }

    pub fn failing_navigations(self, count: usize) -> Self {
        self.navigation_failures.store(count, Ordering::SeqCst);
        self
    }

    /// The first `count` page source reads fail the way a page torn down mid-load does
    pub fn failing_page_sources(self, count: usize) -> Self {
        self.source_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn readiness_polls(&self) -> usize {
        self.ready_polls.load(Ordering::SeqCst)
    }
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        let remaining = self.navigation_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.navigation_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for_element(&self, _selector: &str, _timeout: Duration) -> ScrapeResult<()> {
        Ok(())
    }

    async fn click_element(&self, selector: &str, timeout: Duration) -> ScrapeResult<bool> {
        if !self.ten_year_control {
            tokio::time::sleep(timeout).await;
            return Ok(false);
        }
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(true)
    }

    async fn evaluate(&self, script: &str) -> ScrapeResult<Value> {
        self.scripts.lock().unwrap().push(script.to_string());

        if script == chart_scripts::CHARTS_READY {
            let polls = self.ready_polls.fetch_add(1, Ordering::SeqCst);
            return Ok(Value::Bool(self.ready_after.is_some_and(|n| polls >= n)));
        }
        if script.contains("const labels") {
            return Ok(self
                .range_button
                .clone()
                .filter(|label| script.contains(&format!("\"{label}\"")))
                .map_or(Value::Null, Value::String));
        }
        Ok(self.series.clone())
    }

    async fn page_source(&self) -> ScrapeResult<String> {
        let remaining = self.source_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.source_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ScrapeError::script(
                "page source failed: Cannot find context with specified id",
            ));
        }
        Ok(self.source.clone())
    }

    async fn screenshot_png(&self) -> ScrapeResult<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

/// Extractor that replays queued results, then repeats the fallback
pub struct FakeExtractor {
    queued: Mutex<VecDeque<ScrapeResult<Vec<RawPoint>>>>,
    fallback: ScrapeResult<Vec<RawPoint>>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn always(result: ScrapeResult<Vec<RawPoint>>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(points: Vec<RawPoint>) -> Self {
        Self::always(Ok(points))
    }

    pub fn failing(error: ScrapeError) -> Self {
        Self::always(Err(error))
    }

    /// Replays `results` in order before falling back to `fallback`
    pub fn sequence(
        results: Vec<ScrapeResult<Vec<RawPoint>>>,
        fallback: ScrapeResult<Vec<RawPoint>>,
    ) -> Self {
        Self {
            queued: Mutex::new(results.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeriesExtractor for FakeExtractor {
    async fn extract_raw_points(&self) -> ScrapeResult<Vec<RawPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queued.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Epoch milliseconds of a UTC calendar date
pub fn ts(year: i32, month: u32, day: u32) -> i64 {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}
