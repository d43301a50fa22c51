//! Logging system configuration and initialization
//!
//! This module provides the logging setup for scraper runs:
//! - Console and file output support
//! - Configuration file based log level control, `RUST_LOG` override
//! - Structured JSON logging (optional)
//! - Previous run's log file rotated by timestamp on start-up
//! - UTC timestamps

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_NAME: &str = "vehicle-sales-scraper.log";

/// RFC 3339 UTC timestamps with millisecond precision
struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// Builds the filter from the configured level and module overrides.
/// `RUST_LOG` wins when set.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = vec![config.level.clone()];

        // Dependency chatter stays quiet unless TRACE is requested
        if !config.level.to_lowercase().contains("trace") {
            let mut modules: Vec<_> = config.module_filters.iter().collect();
            modules.sort();
            for (module, level) in modules {
                directives.push(format!("{}={}", module, level));
            }
        }
        directives.push(format!("vehicle_sales_scraper_lib={}", config.level));

        EnvFilter::try_new(directives.join(",")).unwrap_or_else(|e| {
            eprintln!("Invalid log filter ({}), falling back to info", e);
            EnvFilter::new("info")
        })
    })
}

/// Rename an existing log file to `<stem>.<YYYYMMDDTHHMMSS>.log`
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);

    if log_file_path.exists() {
        let metadata = std::fs::metadata(&log_file_path)
            .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;

        let file_time = metadata
            .modified()
            .or_else(|_| metadata.created())
            .unwrap_or_else(|_| std::time::SystemTime::now());

        let datetime: chrono::DateTime<Utc> = file_time.into();
        let file_stem = log_file_name.trim_end_matches(".log");
        let timestamped_name = format!("{}.{}.log", file_stem, datetime.format("%Y%m%dT%H%M%S"));
        let timestamped_path = log_dir.join(&timestamped_name);

        std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
            anyhow!(
                "Failed to rotate log file {} to {}: {}",
                log_file_path.display(),
                timestamped_path.display(),
                e
            )
        })?;
    }

    Ok(())
}

/// Initialize logging with custom configuration
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole process.
///
/// # Environment Variable Override
/// ```bash
/// # Show DevTools protocol traffic
/// RUST_LOG="debug,headless_chrome=debug" cargo run
/// ```
pub fn init_logging_with_config(config: &LoggingConfig, log_dir: &Path) -> Result<Option<WorkerGuard>> {
    let env_filter = build_env_filter(config);
    let registry = Registry::default().with(env_filter);

    let mut guard = None;
    let file_writer = if config.file_output {
        std::fs::create_dir_all(log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        rotate_existing_log_file(log_dir, LOG_FILE_NAME)?;

        let file_appender = rolling::never(log_dir, LOG_FILE_NAME);
        let (writer, file_guard) = non_blocking(file_appender);
        guard = Some(file_guard);
        Some(writer)
    } else {
        None
    };

    match (file_writer, config.console_output) {
        (Some(file_writer), console) => {
            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);
                let console_layer = console.then(|| {
                    fmt::Layer::new()
                        .with_writer(std::io::stdout)
                        .with_timer(UtcTimeFormatter)
                        .with_target(false)
                });
                registry.with(file_layer).with(console_layer).try_init()?;
            } else {
                // File layer with minimal formatting (time + level + message only)
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false)
                    .with_ansi(false);
                let console_layer = console.then(|| {
                    fmt::Layer::new()
                        .with_writer(std::io::stdout)
                        .with_timer(UtcTimeFormatter)
                        .with_target(false)
                });
                registry.with(file_layer).with(console_layer).try_init()?;
            }
        }
        (None, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(UtcTimeFormatter)
                .with_target(false);
            registry.with(console_layer).try_init()?;
        }
        (None, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    info!("Logging system initialized");
    info!("Log directory: {:?}", log_dir);
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    info!("Console output: {}", config.console_output);
    info!("File output: {}", config.file_output);

    if config.file_output && config.auto_cleanup_logs {
        cleanup_old_logs(log_dir, config.max_files)?;
    }

    Ok(guard)
}

/// Log system information for diagnostics
pub fn log_system_info(log_dir: &Path) {
    info!("=== Vehicle Sales Scraper ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }

    info!("Log directory: {:?}", log_dir);
    info!("=============================");
}

/// Delete the oldest `.log` files beyond `max_files`
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files = list_log_files(log_dir)?;

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    if log_files.len() > max_files as usize {
        info!(
            "Removing {} old log files (keeping {})",
            log_files.len() - max_files as usize,
            max_files
        );

        for (path, _) in log_files.iter().skip(max_files as usize) {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}

fn list_log_files(log_dir: &Path) -> Result<Vec<(PathBuf, std::time::SystemTime)>> {
    let mut log_files = Vec::new();
    if !log_dir.exists() {
        return Ok(log_files);
    }

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".log"));
        if !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    Ok(log_files)
}
