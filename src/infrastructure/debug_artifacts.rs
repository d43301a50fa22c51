//! HTML and screenshot dumps for pages that did not yield data

use std::path::PathBuf;
use tracing::{info, warn};

use crate::domain::PageDriver;

/// Writes `<dir>/<slug>__<label>.{html,png}`
#[derive(Debug, Clone)]
pub struct DebugArtifacts {
    dir: PathBuf,
}

impl DebugArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn paths_for(&self, slug: &str, label: &str) -> (PathBuf, PathBuf) {
        let base = format!("{slug}__{label}");
        (
            self.dir.join(format!("{base}.html")),
            self.dir.join(format!("{base}.png")),
        )
    }

    /// Best effort: every failure is logged and swallowed
    pub async fn capture(&self, page: &dyn PageDriver, slug: &str, label: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Could not create debug directory {:?}: {}", self.dir, e);
            return;
        }
        let (html_path, png_path) = self.paths_for(slug, label);

        match page.page_source().await {
            Ok(html) => {
                if let Err(e) = tokio::fs::write(&html_path, html).await {
                    warn!("Failed to write {:?}: {}", html_path, e);
                }
            }
            Err(e) => warn!("[{}] could not read page source for debug dump: {}", slug, e),
        }

        match page.screenshot_png().await {
            Ok(png) => {
                if let Err(e) = tokio::fs::write(&png_path, png).await {
                    warn!("Failed to write {:?}: {}", png_path, e);
                }
            }
            Err(e) => warn!("[{}] could not capture screenshot: {}", slug, e),
        }

        info!("🧾 [{}] debug artifacts saved: {:?}", slug, html_path.with_extension(""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakePage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_capture_writes_html_and_png() {
        let temp = TempDir::new().unwrap();
        let artifacts = DebugArtifacts::new(temp.path().join("debug"));
        let page = FakePage::new().with_source("<html>blocked</html>");

        artifacts.capture(&page, "chile", "no_series_attempt1").await;

        let (html, png) = artifacts.paths_for("chile", "no_series_attempt1");
        assert_eq!(std::fs::read_to_string(html).unwrap(), "<html>blocked</html>");
        assert!(png.exists());
        assert!(png.to_string_lossy().ends_with("chile__no_series_attempt1.png"));
    }

    #[tokio::test]
    async fn test_capture_survives_unwritable_directory() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let artifacts = DebugArtifacts::new(blocker.join("debug"));

        artifacts.capture(&FakePage::new(), "chile", "x").await;
    }
}
