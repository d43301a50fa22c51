//! Headless Chrome page driver
//!
//! Implements the `PageDriver` port on top of `headless_chrome`. The crate's
//! API is blocking, so every call hops onto the blocking pool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{PageDriver, ScrapeError, ScrapeResult};
use crate::infrastructure::config::BrowserConfig;

/// Well-known install locations checked when no binary is configured
const CHROME_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// Single browser session with one tab, reused for every country
pub struct ChromePageDriver {
    // Keeps the browser process alive for as long as the tab is in use
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromePageDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let binary = resolve_binary(config);
        match &binary {
            Some(path) => info!("🌐 Launching browser: {:?}", path),
            None => warn!("No Chrome/Chromium binary configured or found; relying on auto-detection"),
        }

        let args = launch_args(config);
        let arg_refs: Vec<&OsStr> = args.iter().map(OsString::as_os_str).collect();

        let options = LaunchOptions {
            headless: config.headless,
            sandbox: config.sandbox,
            window_size: Some((config.window_width, config.window_height)),
            path: binary,
            args: arg_refs,
            idle_browser_timeout: Duration::from_secs(config.idle_timeout_seconds),
            ..Default::default()
        };

        let browser = Browser::new(options)
            .context("Failed to launch headless Chrome. Is Chrome/Chromium installed?")?;
        let tab = browser.new_tab().context("Failed to create new browser tab")?;

        info!("✅ Browser session ready");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    async fn with_tab<T, F>(&self, op: F) -> ScrapeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> ScrapeResult<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| ScrapeError::Driver(format!("browser task panicked or was cancelled: {e}")))?
    }
}

fn resolve_binary(config: &BrowserConfig) -> Option<PathBuf> {
    if let Some(path) = config.binary.as_ref().filter(|p| p.exists()) {
        return Some(path.clone());
    }
    CHROME_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn launch_args(config: &BrowserConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = config.extra_args.iter().map(OsString::from).collect();
    args.push(OsString::from(format!("--user-agent={}", config.user_agent)));
    args.push(OsString::from(format!("--lang={}", config.lang)));
    args
}

// A page that cannot be read back mid-load is a per-attempt failure; only a
// dead blocking task is a `Driver` error
fn page_read_failed(what: &str, err: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::script(format!("{what} failed: {err}"))
}

/// Scripts return a JSON string; anything else is passed through as-is
fn decode_remote_value(value: Option<Value>) -> ScrapeResult<Value> {
    match value {
        Some(Value::String(json)) => serde_json::from_str(&json)
            .map_err(|e| ScrapeError::invalid_payload(format!("script result is not JSON: {e}"))),
        Some(other) => Ok(other),
        None => Ok(Value::Null),
    }
}

#[async_trait]
impl PageDriver for ChromePageDriver {
    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        let url = url.to_string();
        debug!("navigate -> {}", url);
        self.with_tab(move |tab| {
            tab.navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| ScrapeError::Navigation {
                    url,
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> ScrapeResult<()> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .map(|_| ())
                .map_err(|_| ScrapeError::timeout(format!("element `{selector}`"), timeout))
        })
        .await
    }

    async fn click_element(&self, selector: &str, timeout: Duration) -> ScrapeResult<bool> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let Ok(element) = tab.wait_for_element_with_custom_timeout(&selector, timeout) else {
                return Ok(false);
            };
            element
                .call_js_fn("function() { this.click(); }", vec![], false)
                .map(|_| true)
                .map_err(|e| ScrapeError::script(format!("click on `{selector}` failed: {e}")))
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> ScrapeResult<Value> {
        let script = script.to_string();
        self.with_tab(move |tab| {
            let remote = tab
                .evaluate(&script, false)
                .map_err(|e| ScrapeError::script(e.to_string()))?;
            decode_remote_value(remote.value)
        })
        .await
    }

    async fn page_source(&self) -> ScrapeResult<String> {
        self.with_tab(|tab| tab.get_content().map_err(|e| page_read_failed("page source", e)))
            .await
    }

    async fn screenshot_png(&self) -> ScrapeResult<Vec<u8>> {
        self.with_tab(|tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| page_read_failed("screenshot", e))
        })
        .await
    }
}
