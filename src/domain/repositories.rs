//! Repository interfaces for the persisted panel and its derived outputs
//!
//! Storage format is an infrastructure detail; the pipeline only needs to
//! load the previous master panel and store the reconciled outputs.

use std::collections::BTreeMap;

use super::entities::Panel;
use super::manifest::Manifest;

pub trait PanelRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Previously persisted master panel, `None` on the first run
    fn load_master(&self) -> Result<Option<Panel>, Self::Error>;

    fn store_master(&self, master: &Panel) -> Result<(), Self::Error>;

    /// Advisory recent-window view of the master panel
    fn store_recent_window(&self, recent: &Panel) -> Result<(), Self::Error>;

    fn store_manifest(&self, manifest: &Manifest) -> Result<(), Self::Error>;

    /// Logical name → location of every output this repository writes
    fn locations(&self) -> BTreeMap<String, String>;
}
