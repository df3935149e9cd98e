//! Tool parameters with named defaults.
//!
//! Every tool can run standalone with these fallbacks, which carry the
//! values the original cross-section workflows were tuned with. A JSON file
//! with any subset of the fields overrides them.

use std::path::Path;

use crate::error::Result;

fn default_id_field() -> String {
    "et_id".to_string()
}

/// Reference grid parameters. Elevation intervals are feet, coordinate
/// intervals are meters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub vertical_exaggeration: u32,
    pub min_z: i64,
    pub max_z: i64,
    pub major_elev_interval: i64,
    pub minor_elev_interval: i64,
    pub major_coord_interval: i64,
    pub minor_coord_interval: i64,
    /// Northing span of the full-length probe lines used to locate
    /// coordinate gridlines on each trace.
    pub probe_y_min: f64,
    pub probe_y_max: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            vertical_exaggeration: 50,
            min_z: 0,
            max_z: 2500,
            major_elev_interval: 50,
            minor_elev_interval: 10,
            major_coord_interval: 1000,
            minor_coord_interval: 250,
            probe_y_min: 4_800_000.0,
            probe_y_max: 5_500_000.0,
        }
    }
}

/// Well data attachment parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WellConfig {
    /// Planar buffer distance around the traces, meters.
    pub buffer_distance: f64,
    pub stratigraphy: bool,
    pub construction: bool,
}

impl Default for WellConfig {
    fn default() -> Self {
        Self {
            buffer_distance: 500.0,
            stratigraphy: false,
            construction: true,
        }
    }
}

/// Vertical marker parameters: the fixed elevation span every marker line
/// covers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub bottom: f64,
    pub top: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            bottom: 0.0,
            top: 2500.0,
        }
    }
}

/// Parameters shared by every tool plus the per-tool sections.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the text field holding the cross-section identifier.
    pub id_field: String,
    pub grid: GridConfig,
    pub wells: WellConfig,
    pub markers: MarkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            grid: GridConfig::default(),
            wells: WellConfig::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
