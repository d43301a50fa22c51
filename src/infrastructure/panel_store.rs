//! Gzip-compressed CSV panel repository
//!
//! Layout under `<data_dir>/latest/`:
//! - `master_total_vehicle_sales.csv.gz` (authoritative, read back each run)
//! - `total_vehicle_sales_monthly_last_10y.csv.gz` (advisory recent window)
//! - `manifest.json`
//!
//! Every file is written to a `.tmp` sibling first and renamed into place.

use chrono::{NaiveDate, NaiveDateTime};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Country, Manifest, Observation, Panel, PanelRepository, Period};

pub const MASTER_FILE_NAME: &str = "master_total_vehicle_sales.csv.gz";
pub const RECENT_FILE_NAME: &str = "total_vehicle_sales_monthly_last_10y.csv.gz";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unparseable date '{value}' in {path}")]
    Date { path: PathBuf, value: String },

    #[error("Failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// On-disk row: `country,date,value`
#[derive(Debug, Serialize, Deserialize)]
struct PanelRow {
    country: String,
    date: String,
    value: f64,
}

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS`, truncated to the month
fn parse_period(raw: &str) -> Option<Period> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .map(Period::containing)
}

pub struct GzipCsvPanelRepository {
    dir: PathBuf,
}

impl GzipCsvPanelRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn master_path(&self) -> PathBuf {
        self.dir.join(MASTER_FILE_NAME)
    }

    pub fn recent_path(&self) -> PathBuf {
        self.dir.join(RECENT_FILE_NAME)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    fn read_panel(path: &Path) -> Result<Panel, StoreError> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        let mut reader = csv::Reader::from_reader(GzDecoder::new(BufReader::new(file)));

        let mut observations = Vec::new();
        for row in reader.deserialize::<PanelRow>() {
            let row = row.map_err(|e| StoreError::csv(path, e))?;
            let period = parse_period(&row.date).ok_or_else(|| StoreError::Date {
                path: path.to_path_buf(),
                value: row.date.clone(),
            })?;
            observations.push(Observation::new(Country::new(row.country), period, row.value));
        }

        Ok(Panel::from_observations(observations))
    }

    fn write_panel(path: &Path, panel: &Panel) -> Result<(), StoreError> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut writer = csv::Writer::from_writer(encoder);
        for obs in panel {
            writer
                .serialize(PanelRow {
                    country: obs.country.name().to_string(),
                    date: obs.period.to_string(),
                    value: obs.value,
                })
                .map_err(|e| StoreError::csv(path, e))?;
        }
        let encoder = writer
            .into_inner()
            .map_err(|e| StoreError::io(path, e.into_error()))?;
        let bytes = encoder.finish().map_err(|e| StoreError::io(path, e))?;
        atomic_write(path, &bytes)
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|e| StoreError::io(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))?;
    debug!("wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}

impl PanelRepository for GzipCsvPanelRepository {
    type Error = StoreError;

    fn load_master(&self) -> Result<Option<Panel>, StoreError> {
        let path = self.master_path();
        if !path.exists() {
            info!("No existing master panel at {:?}", path);
            return Ok(None);
        }
        let panel = Self::read_panel(&path)?;
        info!("📂 Loaded master panel: {} rows", panel.len());
        Ok(Some(panel))
    }

    fn store_master(&self, master: &Panel) -> Result<(), StoreError> {
        Self::write_panel(&self.master_path(), master)
    }

    fn store_recent_window(&self, recent: &Panel) -> Result<(), StoreError> {
        Self::write_panel(&self.recent_path(), recent)
    }

    fn store_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(manifest)?;
        atomic_write(&self.manifest_path(), &json)
    }

    fn locations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("master_csv_gz".to_string(), self.master_path().display().to_string()),
            ("recent_csv_gz".to_string(), self.recent_path().display().to_string()),
            ("manifest_json".to_string(), self.manifest_path().display().to_string()),
        ])
    }
}
