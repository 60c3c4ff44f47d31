//! # JSON Output Module
//!
//! This module handles the merge of per-directory country series and the
//! serialization of the final per-country JSON files.
//!
//! ## Features
//!
//! - **Mission-order merge**: series concatenate in configured mission order
//! - **Chronological sort**: records sort by `YYYY-MM-DD` date string, which
//!   is equivalent to chronological order
//! - **Skip-empty**: a country with zero records across all missions gets no
//!   output file at all

use crate::extract::{CountryRecord, CountrySeries};
use log::{debug, info};
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Merges per-directory series into one chronologically sorted series per country.
///
/// Records concatenate in the order the parts are given (mission order), then
/// each country's list is sorted ascending by its date string.
pub fn merge_country_series(parts: Vec<CountrySeries>) -> CountrySeries {
    let mut merged: CountrySeries = CountrySeries::new();
    for part in parts {
        for (country, mut records) in part {
            merged.entry(country).or_default().append(&mut records);
        }
    }
    for records in merged.values_mut() {
        records.sort_by(|a, b| a.date.cmp(&b.date));
    }
    merged
}

/// Builds the output path for one country's series file.
pub fn country_output_path(output_dir: &Path, country: &str) -> PathBuf {
    output_dir.join(format!("{}_groundwater.json", country))
}

/// Writes one JSON file per country with at least one record.
///
/// Creates the output directory as needed and returns the paths written.
/// Countries without records are logged and skipped; no empty file is created
/// for them.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created or a series
/// file cannot be written.
pub fn write_country_series(
    output_dir: &Path,
    series: &CountrySeries,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    for (country, records) in series {
        if records.is_empty() {
            info!("No data available for {}", country);
            continue;
        }
        let path = country_output_path(output_dir, country);
        write_series_file(&path, records)?;
        info!(
            "Saved {} records for {} to {}",
            records.len(),
            country,
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

fn write_series_file(
    path: &Path,
    records: &[CountryRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    debug!("Writing {} records to {}", records.len(), path.display());
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, records)?;
    Ok(())
}
