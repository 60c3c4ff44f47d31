//! # Data Extraction
//!
//! This module turns directories of NetCDF grid files into per-country record
//! series: bounding-box selection over the coordinate arrays, dense subgrid
//! reads with fill-value masking, and NaN-excluded summary statistics.
//!
//! ## Key Components
//!
//! - [`process_directory`]: drives one mission directory file-by-file
//! - [`process_grid_file`]: one file → [`FileOutcome`]
//! - [`extract_country`]: one bounding box → [`CountryOutcome`]
//!
//! Skips are values, not exceptions: a missing variable, an empty
//! intersection, or an all-missing subgrid each surface as a distinct outcome
//! that the caller logs before moving on, so no failure in one file or
//! country ever stops the remaining work.

use crate::dates;
use crate::input::{CountryBounds, PipelineConfig};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while extracting from grid files
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open grid file '{}': {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        source: netcdf::Error,
    },

    #[error("coordinate variable '{0}' not found")]
    MissingCoordinate(String),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-country statistics and raw subgrid for one observation date.
///
/// Serializes to the exact JSON object shape consumed downstream: `date`,
/// `mean`, `min`, `max`, `std` and a `raw_data` block with the selected
/// coordinates and the dense value grid (missing cells as `null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRecord {
    pub date: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
    pub raw_data: RawGrid,
}

/// The selected subgrid backing a record.
///
/// `values` is row-major, sized `lats.len() × lons.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGrid {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// Mapping from country name to its accumulated records for one directory.
pub type CountrySeries = BTreeMap<String, Vec<CountryRecord>>;

/// Outcome of processing one grid file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Records for the countries whose boxes intersect the file's coverage
    Extracted(Vec<(String, CountryRecord)>),
    /// The value variable is absent; the file contributes nothing
    MissingVariable { available: Vec<String> },
}

/// Outcome of extracting one country from one grid file.
#[derive(Debug)]
pub enum CountryOutcome {
    Record(CountryRecord),
    /// The bounding box selects no coordinates in either axis
    NoOverlap,
    /// Every cell inside the box is missing
    AllMissing,
}

/// NaN-excluded summary statistics over a selected subgrid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

impl GridStats {
    /// Computes statistics over present cells only.
    ///
    /// Returns `None` when every cell is missing. `std` is the population
    /// standard deviation of the present cells.
    pub fn from_grid(values: &[Vec<Option<f64>>]) -> Option<GridStats> {
        let present: Vec<f64> = values.iter().flatten().filter_map(|v| *v).collect();
        if present.is_empty() {
            return None;
        }
        let n = present.len() as f64;
        let mean = present.iter().sum::<f64>() / n;
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(GridStats {
            mean,
            min,
            max,
            std: variance.sqrt(),
        })
    }
}

/// Processes every grid file in one mission directory.
///
/// Returns a series for every configured country; a missing directory or an
/// empty file list yields empty series, not an error. Per-file failures are
/// logged and do not stop the remaining files.
pub fn process_directory(
    dir: &Path,
    config: &PipelineConfig,
) -> Result<CountrySeries, ExtractError> {
    let mut series: CountrySeries = config
        .countries
        .keys()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    if !dir.exists() {
        warn!("Directory {} does not exist", dir.display());
        return Ok(series);
    }

    let files = list_grid_files(dir)?;
    if files.is_empty() {
        warn!("No grid files found in {}", dir.display());
        return Ok(series);
    }

    let progress = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        progress.set_style(style);
    }

    for path in &files {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            progress.set_message(name.to_string());
        }
        match process_grid_file(path, config) {
            Ok(FileOutcome::Extracted(records)) => {
                for (country, record) in records {
                    if let Some(list) = series.get_mut(&country) {
                        list.push(record);
                    }
                }
            }
            Ok(FileOutcome::MissingVariable { available }) => {
                warn!(
                    "'{}' not found in {}; available variables: {:?}",
                    config.variable_name,
                    path.display(),
                    available
                );
            }
            Err(err) => {
                error!("Error processing file {}: {}", path.display(), err);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(series)
}

/// Lists the `.nc` files in a directory, sorted by file name.
///
/// Lexicographic order must coincide with chronological order; that is the
/// upstream file-naming contract.
pub fn list_grid_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("nc") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extracts records for every configured country from one grid file.
///
/// Per-country failures are logged here and do not stop the remaining
/// countries; only failures that make the whole file unreadable return `Err`.
pub fn process_grid_file(
    path: &Path,
    config: &PipelineConfig,
) -> Result<FileOutcome, ExtractError> {
    info!("Processing {}", path.display());
    let file = netcdf::open(path).map_err(|source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let (date, date_source) = dates::resolve_observation_date(&file, path, &config.time_name);
    if date_source.is_fallback() {
        warn!(
            "No resolvable observation date for {}; stamping placeholder {} which will sort out of sequence",
            path.display(),
            date
        );
    }
    let date_str = date.format("%Y-%m-%d").to_string();

    let Some(var) = file.variable(&config.variable_name) else {
        let available = file.variables().map(|v| v.name().to_string()).collect();
        return Ok(FileOutcome::MissingVariable { available });
    };

    let lats = coordinate_values(&file, &config.lat_name)?;
    let lons = coordinate_values(&file, &config.lon_name)?;
    debug!(
        "Coverage of {}: lat {:?}..{:?}, lon {:?}..{:?}",
        path.display(),
        lats.first(),
        lats.last(),
        lons.first(),
        lons.last()
    );

    let fill = fill_value(&var);

    let mut records = Vec::new();
    for (country, bounds) in &config.countries {
        match extract_country(&var, &lats, &lons, bounds, fill, &date_str) {
            Ok(CountryOutcome::Record(record)) => {
                debug!("Extracted {} record for {}", country, date_str);
                records.push((country.clone(), record));
            }
            Ok(CountryOutcome::NoOverlap) => {
                debug!(
                    "No coordinates within bounds for {} in {}",
                    country,
                    path.display()
                );
            }
            Ok(CountryOutcome::AllMissing) => {
                debug!(
                    "All values missing for {} in {}",
                    country,
                    path.display()
                );
            }
            Err(err) => {
                error!(
                    "Error extracting {} from {}: {}",
                    country,
                    path.display(),
                    err
                );
            }
        }
    }

    Ok(FileOutcome::Extracted(records))
}

/// Extracts one country's subgrid and statistics from an open value variable.
///
/// Membership against the bounding box is inclusive on all edges. The value
/// variable may be laid out `[time, lat, lon]` (singleton time axis, index 0
/// is read) or bare `[lat, lon]`. A cell that fails to read, equals the fill
/// value, or is NaN becomes a missing cell; it never fails the country.
pub fn extract_country(
    var: &netcdf::Variable,
    lats: &[f64],
    lons: &[f64],
    bounds: &CountryBounds,
    fill_value: Option<f64>,
    date: &str,
) -> Result<CountryOutcome, ExtractError> {
    let lat_indices: Vec<usize> = lats
        .iter()
        .enumerate()
        .filter(|(_, v)| bounds.contains_lat(**v))
        .map(|(idx, _)| idx)
        .collect();
    let lon_indices: Vec<usize> = lons
        .iter()
        .enumerate()
        .filter(|(_, v)| bounds.contains_lon(**v))
        .map(|(idx, _)| idx)
        .collect();

    if lat_indices.is_empty() || lon_indices.is_empty() {
        return Ok(CountryOutcome::NoOverlap);
    }

    let selected_lats: Vec<f64> = lat_indices.iter().map(|&i| lats[i]).collect();
    let selected_lons: Vec<f64> = lon_indices.iter().map(|&i| lons[i]).collect();

    let rank = var.dimensions().len();
    let mut values = vec![vec![None; lon_indices.len()]; lat_indices.len()];
    for (i, &lat_idx) in lat_indices.iter().enumerate() {
        for (j, &lon_idx) in lon_indices.iter().enumerate() {
            let cell = match rank {
                3 => read_cell(var, &[0, lat_idx, lon_idx]),
                2 => read_cell(var, &[lat_idx, lon_idx]),
                _ => None,
            };
            values[i][j] = cell.filter(|v| !is_missing(*v, fill_value));
        }
    }

    let Some(stats) = GridStats::from_grid(&values) else {
        return Ok(CountryOutcome::AllMissing);
    };

    Ok(CountryOutcome::Record(CountryRecord {
        date: date.to_string(),
        mean: stats.mean,
        min: stats.min,
        max: stats.max,
        std: stats.std,
        raw_data: RawGrid {
            lats: selected_lats,
            lons: selected_lons,
            values,
        },
    }))
}

fn coordinate_values(file: &netcdf::File, name: &str) -> Result<Vec<f64>, ExtractError> {
    let var = file
        .variable(name)
        .ok_or_else(|| ExtractError::MissingCoordinate(name.to_string()))?;
    Ok(var.get_values::<f64, _>(..)?)
}

fn read_cell(var: &netcdf::Variable, indices: &[usize]) -> Option<f64> {
    let values = match *indices {
        [i, j] => var.get_values::<f64, _>((i, j)).ok()?,
        [t, i, j] => var.get_values::<f64, _>((t, i, j)).ok()?,
        _ => return None,
    };
    values.first().copied()
}

fn is_missing(value: f64, fill_value: Option<f64>) -> bool {
    value.is_nan() || fill_value.is_some_and(|f| value == f)
}

/// Reads the variable's declared missing-value marker, if any.
fn fill_value(var: &netcdf::Variable) -> Option<f64> {
    for name in ["_FillValue", "missing_value"] {
        if let Some(attr) = var.attribute(name)
            && let Ok(value) = attr.value()
            && let Some(fill) = attribute_as_f64(&value)
        {
            return Some(fill);
        }
    }
    None
}

fn attribute_as_f64(value: &netcdf::AttributeValue) -> Option<f64> {
    match value {
        netcdf::AttributeValue::Float(v) => Some(f64::from(*v)),
        netcdf::AttributeValue::Double(v) => Some(*v),
        netcdf::AttributeValue::Floats(v) => v.first().map(|f| f64::from(*f)),
        netcdf::AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    }
}
