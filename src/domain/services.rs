//! Ports to the browser automation backend
//!
//! The pipeline only talks to these traits, so it does not care which
//! automation technology renders the page.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::entities::RawPoint;
use super::errors::ScrapeResult;

/// Live page context driven by an automation backend
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates the page and waits for the navigation to commit
    async fn navigate(&self, url: &str) -> ScrapeResult<()>;

    /// Waits until an element matching `selector` is present.
    /// Returns `ScrapeError::Timeout` if it never shows up.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> ScrapeResult<()>;

    /// Waits for an element and activates it with a synthetic click.
    /// `Ok(false)` means the element did not show up within `timeout`.
    async fn click_element(&self, selector: &str, timeout: Duration) -> ScrapeResult<bool>;

    /// Evaluates a script in the page context. Scripts return their result as
    /// a JSON string; implementations hand back the decoded value.
    async fn evaluate(&self, script: &str) -> ScrapeResult<Value>;

    /// Current rendered markup
    async fn page_source(&self) -> ScrapeResult<String>;

    /// PNG screenshot of the viewport
    async fn screenshot_png(&self) -> ScrapeResult<Vec<u8>>;
}

/// Narrow extraction contract: no input, a list of numeric pairs out.
/// An empty list means "no data".
#[async_trait]
pub trait SeriesExtractor: Send + Sync {
    async fn extract_raw_points(&self) -> ScrapeResult<Vec<RawPoint>>;
}
