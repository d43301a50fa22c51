//! Chart readiness detection
//!
//! The series only exists in the charting runtime's memory once it has
//! initialised, so "page loaded" is not enough. This polls the runtime
//! predicate until it holds or the deadline passes.

use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::domain::{PageDriver, ScrapeError, ScrapeResult};
use crate::infrastructure::chart_scripts::CHARTS_READY;

#[derive(Debug, Clone, Copy)]
pub struct ReadinessDetector {
    timeout: Duration,
    poll_interval: Duration,
}

impl ReadinessDetector {
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Returns once at least one chart instance exists.
    /// A script error during polling counts as "not ready yet".
    pub async fn wait_until_ready(&self, page: &dyn PageDriver) -> ScrapeResult<()> {
        let deadline = Instant::now() + self.timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match page.evaluate(CHARTS_READY).await {
                Ok(value) if value.as_bool() == Some(true) => {
                    debug!("charts ready after {} poll(s)", polls);
                    return Ok(());
                }
                Ok(_) => {}
                Err(ScrapeError::Driver(message)) => return Err(ScrapeError::Driver(message)),
                Err(e) => trace!("readiness probe failed: {}", e),
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ScrapeError::timeout("Highcharts charts", self.timeout));
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakePage;

    fn detector() -> ReadinessDetector {
        ReadinessDetector::new(Duration::from_secs(60), Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately() {
        let page = FakePage::new();
        detector().wait_until_ready(&page).await.unwrap();
        assert_eq!(page.readiness_polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_polling() {
        let page = FakePage::new().ready_after(3);
        let started = Instant::now();

        detector().wait_until_ready(&page).await.unwrap();

        assert_eq!(page.readiness_polls(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_no_chart_appears() {
        let page = FakePage::new().never_ready();
        let started = Instant::now();

        let err = detector().wait_until_ready(&page).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(60));
        // t = 0, 0.5, ..., 60
        assert_eq!(page.readiness_polls(), 121);
    }
}
