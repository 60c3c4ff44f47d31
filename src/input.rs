//! # Pipeline Configuration Module
//!
//! This module provides configuration parsing and validation for grace2json
//! runs. It handles JSON and YAML configuration files that specify mission
//! data directories, the value variable to extract, country bounding boxes,
//! and the JSON output destination.
//!
//! ## Configuration Structure
//!
//! A configuration file specifies:
//! - **missions**: the satellite missions to download and extract, in merge order
//! - **output_dir**: directory receiving one `<country>_groundwater.json` per country
//! - **variable_name**: name of the value variable in each grid file
//! - **countries**: bounding boxes keyed by output country name
//!
//! Every field has a default matching the reference GRACE/GRACE-FO setup, so
//! an empty `{}` configuration is a valid full pipeline description.
//!
//! ## Example Usage
//!
//! ```rust
//! use grace2json::input::PipelineConfig;
//!
//! // Built-in defaults: GRACE + GRACE-FO, ghana/kenya/india
//! let config = PipelineConfig::default();
//! assert_eq!(config.missions.len(), 2);
//! assert_eq!(config.countries.len(), 3);
//!
//! // Load from a JSON string, overriding only what differs
//! let json = r#"{ "output_dir": "out", "variable_name": "lwe_thickness" }"#;
//! let config = PipelineConfig::from_json(json)?;
//! assert_eq!(config.output_dir.to_str(), Some("out"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Complete configuration for a grace2json pipeline run.
///
/// This struct is the single injected source of truth for both stages: the
/// fetcher reads the mission list and downloader binary, the extractor reads
/// the variable/coordinate names and country bounds, and the writer reads the
/// output directory. There is no ambient configuration state anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Missions to download and extract, in merge order
    #[serde(default = "default_missions")]
    pub missions: Vec<MissionConfig>,
    /// Directory receiving one JSON series file per country
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Name of the value variable in each grid file
    #[serde(default = "default_variable_name")]
    pub variable_name: String,
    /// Name of the latitude coordinate variable
    #[serde(default = "default_lat_name")]
    pub lat_name: String,
    /// Name of the longitude coordinate variable
    #[serde(default = "default_lon_name")]
    pub lon_name: String,
    /// Name of the time coordinate variable
    #[serde(default = "default_time_name")]
    pub time_name: String,
    /// External downloader executable invoked by the fetch stage
    #[serde(default = "default_downloader_bin")]
    pub downloader_bin: String,
    /// Country bounding boxes keyed by output country name
    #[serde(default = "default_countries")]
    pub countries: BTreeMap<String, CountryBounds>,
}

/// A rectangular lat/lon region approximating a country's extent.
///
/// All comparisons against coordinate values are inclusive on both edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountryBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

/// One satellite mission: a downloader collection and its local data directory.
///
/// `end_date` is `None` for a mission still flying; the fetch stage resolves
/// it to the current day at invocation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Short mission label used in logs ("grace", "grace-fo")
    pub name: String,
    /// Downloader collection identifier
    pub collection: String,
    /// Local directory the downloader populates and the extractor reads
    pub data_dir: PathBuf,
    /// Inclusive range start, ISO-8601 `YYYY-MM-DDT00:00:00Z`
    pub start_date: String,
    /// Inclusive range end; `None` means open-ended (resolved to "now")
    pub end_date: Option<String>,
}

impl CountryBounds {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        CountryBounds {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    /// Inclusive longitude membership test.
    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max
    }

    /// Inclusive latitude membership test.
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }
}

fn default_missions() -> Vec<MissionConfig> {
    vec![
        MissionConfig {
            name: "grace".to_string(),
            collection: "TELLUS_GRAC_L3_JPL_RL06_LND_v04".to_string(),
            data_dir: PathBuf::from("data/grace"),
            start_date: "2002-04-04T00:00:00Z".to_string(),
            end_date: Some("2017-10-18T00:00:00Z".to_string()),
        },
        MissionConfig {
            name: "grace-fo".to_string(),
            collection: "TELLUS_GRFO_L3_JPL_RL06.3_LND_v04".to_string(),
            data_dir: PathBuf::from("data/grace-fo"),
            start_date: "2018-05-22T00:00:00Z".to_string(),
            end_date: None,
        },
    ]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/data")
}

fn default_variable_name() -> String {
    "lwe_thickness".to_string()
}

fn default_lat_name() -> String {
    "lat".to_string()
}

fn default_lon_name() -> String {
    "lon".to_string()
}

fn default_time_name() -> String {
    "time".to_string()
}

fn default_downloader_bin() -> String {
    "podaac-data-downloader".to_string()
}

fn default_countries() -> BTreeMap<String, CountryBounds> {
    let mut countries = BTreeMap::new();
    countries.insert("ghana".to_string(), CountryBounds::new(-3.5, 1.5, 4.5, 11.5));
    countries.insert("kenya".to_string(), CountryBounds::new(33.5, 42.0, -5.0, 5.0));
    countries.insert("india".to_string(), CountryBounds::new(68.0, 98.0, 6.0, 38.0));
    countries
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            missions: default_missions(),
            output_dir: default_output_dir(),
            variable_name: default_variable_name(),
            lat_name: default_lat_name(),
            lon_name: default_lon_name(),
            time_name: default_time_name(),
            downloader_bin: default_downloader_bin(),
            countries: default_countries(),
        }
    }
}

impl PipelineConfig {
    /// Loads a pipeline configuration from a JSON or YAML file.
    ///
    /// The format is chosen by file extension: `.yaml`/`.yml` parse as YAML,
    /// anything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as the
    /// selected format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Loads a pipeline configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: PipelineConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }

    /// Loads a pipeline configuration from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: PipelineConfig = serde_yaml::from_str(yaml_str)?;
        Ok(config)
    }
}
