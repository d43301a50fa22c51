//! Infrastructure layer for the browser backend, storage, and configuration
//!
//! This module provides the headless Chrome page driver, the in-page chart
//! scripts, the gzip CSV panel store, debug artifact capture, and the
//! configuration and logging setup.

pub mod browser; // headless_chrome PageDriver
pub mod chart_extractor; // SeriesExtractor over any PageDriver
pub mod chart_scripts; // Highcharts IIFEs
pub mod config; // Configuration constants and helpers
pub mod debug_artifacts;
pub mod logging; // Logging infrastructure
pub mod panel_store; // Master/recent CSV.gz + manifest

// Re-export commonly used items
pub use browser::ChromePageDriver;
pub use chart_extractor::ChartSeriesExtractor;
pub use config::{AppConfig, ConfigManager, trading_economics};
pub use debug_artifacts::DebugArtifacts;
pub use logging::{init_logging_with_config, log_system_info};
pub use panel_store::{GzipCsvPanelRepository, StoreError};
