//! Vehicle Sales Scraper - monthly total vehicle sales panel
//!
//! Scrapes client-side rendered Highcharts series for a fixed list of
//! countries and reconciles them into a deduplicated master panel.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;
