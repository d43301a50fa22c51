#![allow(missing_docs)]

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use vehicle_sales_scraper_lib::application::{CountryScraper, ScrapePipeline};
use vehicle_sales_scraper_lib::domain::{PageDriver, SeriesExtractor};
use vehicle_sales_scraper_lib::infrastructure::{
    ChartSeriesExtractor, ChromePageDriver, ConfigManager, GzipCsvPanelRepository,
    init_logging_with_config, log_system_info,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigManager::new()?.load_effective_config().await?;

    let log_dir = config.logging.log_directory(&config.output.data_dir);
    // Flushes the file writer on drop
    let _log_guard = init_logging_with_config(&config.logging, &log_dir)?;
    log_system_info(&log_dir);

    let browser_config = config.browser.clone();
    let driver = tokio::task::spawn_blocking(move || ChromePageDriver::launch(&browser_config))
        .await
        .context("Browser launch task failed")??;
    let page: Arc<dyn PageDriver> = Arc::new(driver);
    let extractor: Arc<dyn SeriesExtractor> =
        Arc::new(ChartSeriesExtractor::new(Arc::clone(&page), &config.extraction));

    let scraper = CountryScraper::new(Arc::clone(&page), extractor, &config);
    let repository = GzipCsvPanelRepository::new(config.output.latest_dir());
    let pipeline = ScrapePipeline::new(&config, scraper, repository);

    match pipeline.run().await {
        Ok(output) => {
            info!("✅ Run complete: {} master rows, {} recent rows", output.master.len(), output.recent.len());
            for (name, location) in &output.manifest.files {
                info!("  {} → {}", name, location);
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ Run failed: {}", e);
            Err(e.into())
        }
    }
}
