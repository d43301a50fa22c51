//! Domain module - Core types and ports
//!
//! This module contains the scraped data model (countries, periods,
//! observations, panels), the per-attempt state machine vocabulary, and the
//! traits the pipeline uses to reach the browser and the persisted panel.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod entities;
pub mod errors;
pub mod events;
pub mod manifest;
pub mod repositories;
pub mod services;
pub mod value_objects;

// Re-export commonly used items for convenience
pub use entities::{Observation, Panel, RawPoint};
pub use errors::{ScrapeError, ScrapeResult};
pub use events::{CountryOutcome, ScrapeStage};
pub use manifest::{DatasetDescriptor, Manifest};
pub use repositories::PanelRepository;
pub use services::{PageDriver, SeriesExtractor};
pub use value_objects::{Country, Period, SlugResolver};
