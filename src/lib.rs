//! # grace2json
//!
//! A Rust library and CLI for extracting per-country groundwater series from
//! GRACE/GRACE-FO satellite gravimetry grids.
//!
//! ## Features
//!
//! - **Two-stage pipeline**: best-effort bulk download, then sequential extraction
//! - **Bounding-box selection**: inclusive lat/lon masks per configured country
//! - **Missing-data aware**: fill-value and NaN cells excluded from statistics,
//!   serialized as explicit `null` in the raw subgrid
//! - **Resilient by construction**: skips are outcome values, never aborts; one
//!   bad file or country cannot stop a run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grace2json::{process_groundwater_job, input::PipelineConfig};
//!
//! // Built-in configuration: GRACE + GRACE-FO, ghana/kenya/india
//! let config = PipelineConfig::default();
//!
//! // Extract every mission directory and write one JSON file per country
//! process_groundwater_job(&config).expect("Failed to process grid files");
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "output_dir": "public/data",
//!   "variable_name": "lwe_thickness",
//!   "countries": {
//!     "ghana": { "lon_min": -3.5, "lon_max": 1.5, "lat_min": 4.5, "lat_max": 11.5 }
//!   }
//! }
//! ```

pub mod cli;
pub mod dates;
pub mod extract;
pub mod fetch;
pub mod info;
pub mod input;
pub mod log;
pub mod output;

#[cfg(test)]
mod tests;

use crate::extract::process_directory;
use crate::input::PipelineConfig;
use crate::output::{merge_country_series, write_country_series};

/// Extracts and writes the per-country series for every configured mission.
///
/// This function orchestrates the extraction stage:
/// 1. Processes each mission's data directory independently
/// 2. Merges the per-directory series in mission order
/// 3. Sorts each country's records chronologically
/// 4. Writes one JSON file per country with at least one record
///
/// # Arguments
///
/// * `config` - The pipeline configuration specifying missions, variable and
///   coordinate names, country bounds, and the output directory
///
/// # Returns
///
/// Returns `Ok(())` when the run completes, even if individual files or
/// countries were skipped along the way; those are logged, not errors.
///
/// # Errors
///
/// This function will return an error if:
/// - A mission directory exists but cannot be enumerated
/// - The output directory cannot be created
/// - A series file cannot be written
pub fn process_groundwater_job(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut parts = Vec::new();
    for mission in &config.missions {
        ::log::info!(
            "Processing {} data from {}",
            mission.name,
            mission.data_dir.display()
        );
        parts.push(process_directory(&mission.data_dir, config)?);
    }

    let merged = merge_country_series(parts);
    let written = write_country_series(&config.output_dir, &merged)?;
    ::log::info!("Wrote {} country series files", written.len());

    Ok(())
}
