//! Per-country retry controller
//!
//! Drives one country through `Navigating → AwaitingReady → SelectingRange →
//! Extracting` with a bounded number of attempts. Failures never escape:
//! the caller always gets a `CountryReport`.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::application::normalizer::normalize;
use crate::application::range_selector::RangeSelector;
use crate::application::readiness::ReadinessDetector;
use crate::domain::{
    Country, CountryOutcome, Observation, PageDriver, RawPoint, ScrapeError, ScrapeResult, ScrapeStage,
    SeriesExtractor,
};
use crate::infrastructure::config::{AppConfig, RetryConfig};
use crate::infrastructure::debug_artifacts::DebugArtifacts;

/// `retries + 1` attempts, linear backoff `base_delay + attempt_index` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    /// Treat a clean empty extraction as retryable instead of final
    pub retry_on_empty: bool,
}

impl RetryPolicy {
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before the retry that follows attempt `attempt_index` (0-based)
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.base_delay + Duration::from_secs(u64::from(attempt_index))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            base_delay: config.base_delay(),
            retry_on_empty: config.retry_on_empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryReport {
    pub country: Country,
    pub url: String,
    pub outcome: CountryOutcome,
    pub attempts: u32,
    pub observations: Vec<Observation>,
}

/// Page-load settings used on entry to each attempt
#[derive(Debug, Clone)]
struct PageLoad {
    timeout: Duration,
    body_grace: Duration,
}

pub struct CountryScraper {
    page: Arc<dyn PageDriver>,
    extractor: Arc<dyn SeriesExtractor>,
    readiness: ReadinessDetector,
    range: RangeSelector,
    policy: RetryPolicy,
    load: PageLoad,
    challenge_keywords: Vec<String>,
    artifacts: Option<DebugArtifacts>,
}

enum AttemptResult {
    Points(Vec<RawPoint>),
    Failed(ScrapeError),
}

impl CountryScraper {
    pub fn new(
        page: Arc<dyn PageDriver>,
        extractor: Arc<dyn SeriesExtractor>,
        config: &AppConfig,
    ) -> Self {
        let artifacts = config
            .output
            .debug_artifacts
            .then(|| DebugArtifacts::new(config.output.debug_dir()));
        Self {
            page,
            extractor,
            readiness: ReadinessDetector::new(
                config.timing.readiness_timeout(),
                config.timing.readiness_poll_interval(),
            ),
            range: RangeSelector::standard(&config.extraction, &config.timing),
            policy: RetryPolicy::from(&config.retry),
            load: PageLoad {
                timeout: config.timing.page_load_timeout(),
                body_grace: config.timing.body_grace(),
            },
            challenge_keywords: config.extraction.challenge_keywords.clone(),
            artifacts,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn scrape(&self, country: &Country, slug: &str, url: &str) -> CountryReport {
        let max_attempts = self.policy.max_attempts();
        let mut last_error: Option<ScrapeError> = None;
        let mut attempts = 0u32;

        for attempt in 0..max_attempts {
            attempts += 1;
            let is_last = attempt + 1 == max_attempts;

            match self.attempt(country, slug, url, attempt).await {
                AttemptResult::Points(points) => {
                    let observations = if points.is_empty() {
                        Vec::new()
                    } else {
                        normalize(country, &points)
                    };

                    if !observations.is_empty() {
                        info!("✅ [{}] rows={} (attempt {}/{})", country, observations.len(), attempts, max_attempts);
                        return CountryReport {
                            country: country.clone(),
                            url: url.to_string(),
                            outcome: CountryOutcome::Succeeded {
                                rows: observations.len(),
                            },
                            attempts,
                            observations,
                        };
                    }

                    self.dump(slug, &format!("no_series_attempt{attempt}")).await;
                    if !self.policy.retry_on_empty || is_last {
                        warn!("⚠️ [{}] no data extracted (raw points: {})", country, points.len());
                        return CountryReport {
                            country: country.clone(),
                            url: url.to_string(),
                            outcome: CountryOutcome::NoData,
                            attempts,
                            observations: Vec::new(),
                        };
                    }
                    debug!("[{}] empty extraction, retrying", country);
                }
                AttemptResult::Failed(error) => {
                    warn!("❌ [{}] attempt {}/{} failed: {}", country, attempts, max_attempts, error);
                    let retryable = error.is_retryable();
                    last_error = Some(error);
                    if !retryable {
                        break;
                    }
                }
            }

            if !is_last {
                let delay = self.policy.backoff(attempt);
                debug!("[{}] backing off {:?} before retry", country, delay);
                sleep(delay).await;
            }
        }

        let last_error = last_error.map_or_else(|| "no data after retries".to_string(), |e| e.to_string());
        warn!("[fail] {}: {}", country, last_error);
        CountryReport {
            country: country.clone(),
            url: url.to_string(),
            outcome: CountryOutcome::Failed { last_error },
            attempts,
            observations: Vec::new(),
        }
    }

    async fn attempt(&self, country: &Country, slug: &str, url: &str, attempt: u32) -> AttemptResult {
        let mut stage = ScrapeStage::Navigating;
        match self.run_stages(slug, url, attempt, &mut stage).await {
            Ok(points) => AttemptResult::Points(points),
            Err(error) => {
                debug!("[{}] attempt {} aborted in {}", country, attempt, stage);
                AttemptResult::Failed(error)
            }
        }
    }

    async fn run_stages(
        &self,
        slug: &str,
        url: &str,
        attempt: u32,
        stage: &mut ScrapeStage,
    ) -> ScrapeResult<Vec<RawPoint>> {
        let page = self.page.as_ref();

        *stage = ScrapeStage::Navigating;
        timeout(self.load.timeout, page.navigate(url))
            .await
            .map_err(|_| ScrapeError::timeout(format!("navigation to {url}"), self.load.timeout))??;
        page.wait_for_element("body", self.load.timeout).await?;
        sleep(self.load.body_grace).await;
        self.check_for_challenge().await?;

        *stage = ScrapeStage::AwaitingReady;
        if let Err(e) = self.readiness.wait_until_ready(page).await {
            if e.is_timeout() {
                self.dump(slug, &format!("no_highcharts_attempt{attempt}")).await;
            }
            return Err(e);
        }

        *stage = ScrapeStage::SelectingRange;
        self.range.select(page).await?;

        *stage = ScrapeStage::Extracting;
        self.extractor.extract_raw_points().await
    }

    async fn check_for_challenge(&self) -> ScrapeResult<()> {
        if self.challenge_keywords.is_empty() {
            return Ok(());
        }
        let source = self.page.page_source().await?;
        match find_challenge_keyword(&source, &self.challenge_keywords) {
            Some(keyword) => Err(ScrapeError::ChallengeDetected {
                keyword: keyword.to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn dump(&self, slug: &str, label: &str) {
        if let Some(artifacts) = &self.artifacts {
            artifacts.capture(self.page.as_ref(), slug, label).await;
        }
    }
}

/// First keyword found in `source`, case-insensitive
pub fn find_challenge_keyword<'a>(source: &str, keywords: &'a [String]) -> Option<&'a str> {
    let haystack = source.to_lowercase();
    keywords
        .iter()
        .find(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeExtractor, FakePage, ts};
    use tokio::time::Instant;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.output.debug_artifacts = false;
        config
    }

    fn scraper(page: Arc<FakePage>, extractor: Arc<FakeExtractor>) -> CountryScraper {
        CountryScraper::new(page, extractor, &config())
    }

    const URL: &str = "https://tradingeconomics.com/chile/total-vehicle-sales";

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(1), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_normalizes_points() {
        let page = Arc::new(FakePage::new());
        let extractor = Arc::new(FakeExtractor::returning(vec![
            RawPoint::new(ts(2020, 1, 1), 10.5),
            RawPoint::new(ts(2020, 1, 1), 11.0),
        ]));

        let report = scraper(page.clone(), extractor)
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert_eq!(report.outcome, CountryOutcome::Succeeded { rows: 1 });
        assert_eq!(report.attempts, 1);
        assert_eq!(report.observations[0].value, 11.0);
        assert_eq!(page.navigations(), vec![URL.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_makes_exactly_retries_plus_one_attempts() {
        let page = Arc::new(FakePage::new());
        let extractor = Arc::new(FakeExtractor::failing(ScrapeError::script("Highcharts is not defined")));
        let started = Instant::now();

        let report = scraper(page.clone(), extractor.clone())
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert_eq!(extractor.calls(), 3);
        assert_eq!(report.attempts, 3);
        assert_eq!(page.navigations().len(), 3);
        assert!(matches!(report.outcome, CountryOutcome::Failed { ref last_error } if last_error.contains("Highcharts")));
        // per attempt: 2s grace + 10s control lookup; backoffs 2s + 3s
        assert_eq!(started.elapsed(), Duration::from_secs(3 * 12 + 2 + 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let page = Arc::new(FakePage::new().failing_navigations(1));
        let extractor = Arc::new(FakeExtractor::returning(vec![RawPoint::new(ts(2021, 4, 1), 3.0)]));

        let report = scraper(page, extractor.clone())
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert!(report.outcome.is_success());
        assert_eq!(report.attempts, 2);
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_extraction_is_no_data_without_retry() {
        let page = Arc::new(FakePage::new());
        let extractor = Arc::new(FakeExtractor::returning(Vec::new()));

        let report = scraper(page, extractor.clone())
            .scrape(&Country::new("China"), "china", URL)
            .await;

        assert_eq!(report.outcome, CountryOutcome::NoData);
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_extraction_retried_when_configured() {
        let page = Arc::new(FakePage::new());
        let extractor = Arc::new(FakeExtractor::sequence(
            vec![Ok(Vec::new())],
            Ok(vec![RawPoint::new(ts(2022, 1, 1), 8.0)]),
        ));
        let policy = RetryPolicy {
            retry_on_empty: true,
            ..RetryPolicy::from(&RetryConfig::default())
        };

        let report = scraper(page, extractor.clone())
            .with_policy(policy)
            .scrape(&Country::new("China"), "china", URL)
            .await;

        assert!(report.outcome.is_success());
        assert_eq!(extractor.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_page_is_retried_then_fails() {
        let page = Arc::new(FakePage::new().with_source("<title>Just a moment...</title>"));
        let extractor = Arc::new(FakeExtractor::returning(vec![RawPoint::new(ts(2022, 1, 1), 8.0)]));

        let report = scraper(page.clone(), extractor.clone())
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert!(matches!(report.outcome, CountryOutcome::Failed { ref last_error } if last_error.contains("challenge")));
        assert_eq!(page.navigations().len(), 3);
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_source_failure_is_retried() {
        let page = Arc::new(FakePage::new().failing_page_sources(1));
        let extractor = Arc::new(FakeExtractor::returning(vec![RawPoint::new(ts(2021, 4, 1), 3.0)]));

        let report = scraper(page.clone(), extractor.clone())
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert_eq!(report.outcome, CountryOutcome::Succeeded { rows: 1 });
        assert_eq!(report.attempts, 2);
        assert_eq!(page.navigations().len(), 2);
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_error_is_not_retried() {
        let page = Arc::new(FakePage::new());
        let extractor = Arc::new(FakeExtractor::failing(ScrapeError::Driver("connection closed".into())));

        let report = scraper(page, extractor.clone())
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert_eq!(report.attempts, 1);
        assert_eq!(extractor.calls(), 1);
        assert!(!report.outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_timeout_dumps_artifacts() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.output.data_dir = temp.path().to_path_buf();
        config.retry.retries = 0;
        let page = Arc::new(FakePage::new().never_ready());
        let extractor = Arc::new(FakeExtractor::returning(Vec::new()));

        let report = CountryScraper::new(page, extractor.clone(), &config)
            .scrape(&Country::new("Chile"), "chile", URL)
            .await;

        assert!(matches!(report.outcome, CountryOutcome::Failed { .. }));
        assert_eq!(extractor.calls(), 0);
        assert!(temp.path().join("debug").join("chile__no_highcharts_attempt0.html").exists());
    }

    #[test]
    fn test_find_challenge_keyword_is_case_insensitive() {
        let keywords = vec!["Verify you are human".to_string(), String::new()];
        assert_eq!(
            find_challenge_keyword("<p>VERIFY YOU ARE HUMAN</p>", &keywords),
            Some("Verify you are human")
        );
        assert_eq!(find_challenge_keyword("<p>Vehicle sales</p>", &keywords), None);
    }
}
