//! # CLI Module
//!
//! This module provides the command-line interface for grace2json, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML) with CLI overrides layered on top
//! - Subcommands for the two pipeline stages and supporting operations
//! - Country-bounds DSL parsing for command line overrides
//! - Shell completion generation

use crate::input::{CountryBounds, PipelineConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

/// GRACE/GRACE-FO groundwater extractor producing per-country JSON series
#[derive(Parser, Debug)]
#[command(name = "grace2json")]
#[command(about = "Extract per-country groundwater series from GRACE/GRACE-FO grids")]
#[command(version)]
#[command(long_about = "
grace2json downloads GRACE and GRACE-FO land water-equivalent-thickness grids
through the PO.DAAC bulk downloader and extracts per-country summary
statistics and raw subgrids into one JSON file per country.

The built-in configuration covers the reference setup (GRACE 2002-2017,
GRACE-FO 2018-present, countries ghana/kenya/india); a JSON or YAML
configuration file can replace any part of it without code changes.

EXAMPLES:
  # Full pipeline with the built-in configuration
  grace2json run

  # Extraction only, against already-downloaded data
  grace2json extract

  # Custom configuration plus an extra country
  grace2json extract --config pipeline.yaml \\
    --country 'nigeria:2.5:15.0:4.0:14.0'

  # Inspect a downloaded grid file
  grace2json info data/grace/GRD-3_2002095-2002120_GRAC_JPLEM_BA01_0600_LND_v04.nc

  # Write a configuration template to edit
  grace2json template --format yaml > pipeline.yaml
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "GRACE2JSON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download mission data through the external downloader
    #[command(long_about = "
Invoke the bulk downloader once per configured mission to populate the
mission data directories. Download failures are logged and never fail the
command; extraction works with whatever is on disk.
")]
    Fetch,

    /// Extract per-country series from already-downloaded grids
    Extract {
        #[command(flatten)]
        args: ExtractArgs,
    },

    /// Fetch then extract (the full pipeline)
    Run {
        #[command(flatten)]
        args: ExtractArgs,
    },

    /// Show information about a NetCDF grid file
    Info {
        /// NetCDF file path
        file: String,

        /// Show attribute detail
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },

    /// Print a configuration template
    Template {
        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Overrides shared by the `extract` and `run` subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct ExtractArgs {
    /// Override the output directory from config
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override the value variable name from config
    #[arg(short = 'n', long)]
    pub variable: Option<String>,

    /// Add or replace a country box: 'name:lon_min:lon_max:lat_min:lat_max'
    #[arg(long = "country", value_parser = parse_country_bounds)]
    pub countries: Vec<CountryBoundsArg>,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Country bounding box argument from command line
#[derive(Clone, Debug, PartialEq)]
pub struct CountryBoundsArg {
    pub name: String,
    pub bounds: CountryBounds,
}

/// Parse a country bounds override from command line argument
/// Format: name:lon_min:lon_max:lat_min:lat_max
fn parse_country_bounds(s: &str) -> Result<CountryBoundsArg, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 5 {
        return Err(
            "Country bounds must be in format 'name:lon_min:lon_max:lat_min:lat_max'".to_string(),
        );
    }

    let name = parts[0].trim().to_string();
    if name.is_empty() {
        return Err("Country name cannot be empty".to_string());
    }

    let lon_min = parts[1]
        .parse::<f64>()
        .map_err(|_| "Invalid minimum longitude")?;
    let lon_max = parts[2]
        .parse::<f64>()
        .map_err(|_| "Invalid maximum longitude")?;
    let lat_min = parts[3]
        .parse::<f64>()
        .map_err(|_| "Invalid minimum latitude")?;
    let lat_max = parts[4]
        .parse::<f64>()
        .map_err(|_| "Invalid maximum latitude")?;

    if lon_min >= lon_max {
        return Err("Minimum longitude must be less than maximum longitude".to_string());
    }
    if lat_min >= lat_max {
        return Err("Minimum latitude must be less than maximum latitude".to_string());
    }

    Ok(CountryBoundsArg {
        name,
        bounds: CountryBounds::new(lon_min, lon_max, lat_min, lat_max),
    })
}

/// Loads the pipeline configuration and layers CLI overrides on top.
///
/// With no `--config` the built-in defaults apply; override arguments replace
/// individual fields and insert or replace country boxes by name.
pub fn load_config(
    config_path: Option<&Path>,
    args: Option<&ExtractArgs>,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(args) = args {
        if let Some(dir) = &args.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(variable) = &args.variable {
            config.variable_name = variable.clone();
        }
        for country in &args.countries {
            config.countries.insert(country.name.clone(), country.bounds);
        }
    }

    Ok(config)
}

/// Renders the default configuration as a template in the requested format.
pub fn render_template(format: &ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let config = PipelineConfig::default();
    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
    };
    Ok(rendered)
}
