use crate::extract::{CountryRecord, RawGrid};
use std::path::Path;

/// Missing-value marker used by the synthetic grid fixtures.
const FILL: f64 = -99999.0;

/// Description of a synthetic grid file written with [`write_grid_file`].
struct GridFixture {
    lats: Vec<f64>,
    lons: Vec<f64>,
    /// Row-major lat × lon cell values
    values: Vec<f64>,
    fill_value: Option<f64>,
    time: Option<TimeAxis>,
    with_variable: bool,
}

enum TimeAxis {
    /// `time(1)` carrying a CF units attribute
    Units { units: &'static str, value: f64 },
    /// `time(1)` without any units attribute
    Bare { value: f64 },
}

impl GridFixture {
    /// A grid spanning lat 0.5..11.5, lon -3.5..1.5 (fully containing the
    /// ghana box, intersecting neither kenya nor india) with a uniform value.
    fn ghana_cover(value: f64) -> Self {
        let lats: Vec<f64> = (0..12).map(|i| 0.5 + i as f64).collect();
        let lons: Vec<f64> = (0..6).map(|i| -3.5 + i as f64).collect();
        let values = vec![value; lats.len() * lons.len()];
        GridFixture {
            lats,
            lons,
            values,
            fill_value: Some(FILL),
            time: Some(TimeAxis::Units {
                units: "days since 2002-01-01",
                value: 100.0,
            }),
            with_variable: true,
        }
    }
}

fn write_grid_file(path: &Path, fixture: &GridFixture) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("lat", fixture.lats.len())?;
    file.add_dimension("lon", fixture.lons.len())?;
    if fixture.time.is_some() {
        file.add_dimension("time", 1)?;
    }

    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_values(&fixture.lats, ..)?;
    }
    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_values(&fixture.lons, ..)?;
    }
    if let Some(time) = &fixture.time {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        match time {
            TimeAxis::Units { units, value } => {
                time_var.put_attribute("units", *units)?;
                time_var.put_values(&[*value], ..)?;
            }
            TimeAxis::Bare { value } => {
                time_var.put_values(&[*value], ..)?;
            }
        }
    }
    if fixture.with_variable {
        let dims: Vec<&str> = if fixture.time.is_some() {
            vec!["time", "lat", "lon"]
        } else {
            vec!["lat", "lon"]
        };
        let mut var = file.add_variable::<f64>("lwe_thickness", &dims)?;
        if let Some(fill) = fixture.fill_value {
            var.put_attribute("_FillValue", fill)?;
        }
        var.put_values(&fixture.values, ..)?;
    }

    Ok(())
}

/// A minimal record for merge/write tests.
fn sample_record(date: &str, value: f64) -> CountryRecord {
    CountryRecord {
        date: date.to_string(),
        mean: value,
        min: value,
        max: value,
        std: 0.0,
        raw_data: RawGrid {
            lats: vec![5.5],
            lons: vec![-0.5],
            values: vec![vec![Some(value)]],
        },
    }
}

#[cfg(test)]
mod input_tests {
    use crate::input::{CountryBounds, PipelineConfig};

    #[test]
    fn test_default_config_matches_reference_setup() {
        let config = PipelineConfig::default();

        assert_eq!(config.variable_name, "lwe_thickness");
        assert_eq!(config.lat_name, "lat");
        assert_eq!(config.lon_name, "lon");
        assert_eq!(config.downloader_bin, "podaac-data-downloader");

        assert_eq!(config.countries.len(), 3);
        assert_eq!(
            config.countries["ghana"],
            CountryBounds::new(-3.5, 1.5, 4.5, 11.5)
        );
        assert_eq!(
            config.countries["kenya"],
            CountryBounds::new(33.5, 42.0, -5.0, 5.0)
        );
        assert_eq!(
            config.countries["india"],
            CountryBounds::new(68.0, 98.0, 6.0, 38.0)
        );

        assert_eq!(config.missions.len(), 2);
        assert_eq!(config.missions[0].collection, "TELLUS_GRAC_L3_JPL_RL06_LND_v04");
        assert_eq!(config.missions[0].start_date, "2002-04-04T00:00:00Z");
        assert_eq!(
            config.missions[0].end_date.as_deref(),
            Some("2017-10-18T00:00:00Z")
        );
        assert_eq!(
            config.missions[1].collection,
            "TELLUS_GRFO_L3_JPL_RL06.3_LND_v04"
        );
        assert_eq!(config.missions[1].end_date, None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{ "variable_name": "lwe" }"#).unwrap();
        assert_eq!(config.variable_name, "lwe");
        assert_eq!(config.countries.len(), 3);
        assert_eq!(config.missions.len(), 2);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = PipelineConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.countries, config.countries);
        assert_eq!(parsed.output_dir, config.output_dir);
    }

    #[test]
    fn test_bounds_membership_is_inclusive() {
        let bounds = CountryBounds::new(-3.5, 1.5, 4.5, 11.5);
        assert!(bounds.contains_lon(-3.5));
        assert!(bounds.contains_lon(1.5));
        assert!(!bounds.contains_lon(1.6));
        assert!(bounds.contains_lat(4.5));
        assert!(bounds.contains_lat(11.5));
        assert!(!bounds.contains_lat(4.4));
    }
}

#[cfg(test)]
mod date_tests {
    use super::*;
    use crate::dates::{self, DateSource};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_filename_yyyyddd() {
        let path = Path::new("GRD-3_2002095-2002120_GRAC_JPLEM_BA01_0600_LND_v04.nc");
        assert_eq!(
            dates::date_from_filename(path),
            NaiveDate::from_ymd_opt(2002, 4, 5)
        );
    }

    #[test]
    fn test_filename_yyyymm() {
        let path = Path::new("GRCTellus-200205-monthly.nc");
        assert_eq!(
            dates::date_from_filename(path),
            NaiveDate::from_ymd_opt(2002, 5, 1)
        );
    }

    #[test]
    fn test_filename_without_date_code() {
        assert_eq!(dates::date_from_filename(Path::new("nodata.nc")), None);
        // Short digit runs and out-of-range day-of-year codes are rejected
        assert_eq!(dates::date_from_filename(Path::new("BA01_0600_LND.nc")), None);
        assert_eq!(dates::date_from_filename(Path::new("x_2002999_y.nc")), None);
    }

    #[test]
    fn test_time_units_attribute_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        write_grid_file(&path, &GridFixture::ghana_cover(1.0)).unwrap();

        let file = netcdf::open(&path).unwrap();
        let (date, source) = dates::resolve_observation_date(&file, &path, "time");
        // 2002-01-01 + 100 days, not the filename code
        assert_eq!(date, NaiveDate::from_ymd_opt(2002, 4, 11).unwrap());
        assert_eq!(source, DateSource::TimeUnits);
    }

    #[test]
    fn test_bare_time_value_uses_epoch_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        let mut fixture = GridFixture::ghana_cover(1.0);
        fixture.time = Some(TimeAxis::Bare { value: 31.0 });
        write_grid_file(&path, &fixture).unwrap();

        let file = netcdf::open(&path).unwrap();
        let (date, source) = dates::resolve_observation_date(&file, &path, "time");
        assert_eq!(date, NaiveDate::from_ymd_opt(2002, 2, 1).unwrap());
        assert_eq!(source, DateSource::EpochOffset);
    }

    #[test]
    fn test_unusable_time_value_falls_back_to_filename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        let mut fixture = GridFixture::ghana_cover(1.0);
        fixture.time = Some(TimeAxis::Units {
            units: "days since 2002-01-01",
            value: f64::NAN,
        });
        write_grid_file(&path, &fixture).unwrap();

        let file = netcdf::open(&path).unwrap();
        let (date, source) = dates::resolve_observation_date(&file, &path, "time");
        assert_eq!(date, NaiveDate::from_ymd_opt(2002, 4, 5).unwrap());
        assert_eq!(source, DateSource::Filename);
    }

    #[test]
    fn test_placeholder_when_nothing_resolves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nodata.nc");
        let mut fixture = GridFixture::ghana_cover(1.0);
        fixture.time = None;
        write_grid_file(&path, &fixture).unwrap();

        let file = netcdf::open(&path).unwrap();
        let (date, source) = dates::resolve_observation_date(&file, &path, "time");
        assert_eq!(date, dates::fallback_date());
        assert_eq!(source, DateSource::Fallback);
        assert!(source.is_fallback());
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2023-01-01");
    }
}

#[cfg(test)]
mod stats_tests {
    use crate::extract::GridStats;

    #[test]
    fn test_population_std() {
        let grid = vec![vec![Some(1.0), Some(2.0)], vec![Some(3.0), Some(4.0)]];
        let stats = GridStats::from_grid(&grid).unwrap();
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_missing_cells_excluded() {
        let grid = vec![vec![Some(10.0), None], vec![None, Some(20.0)]];
        let stats = GridStats::from_grid(&grid).unwrap();
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 20.0);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
    }

    #[test]
    fn test_all_missing_yields_none() {
        let grid: Vec<Vec<Option<f64>>> = vec![vec![None, None], vec![None, None]];
        assert!(GridStats::from_grid(&grid).is_none());
    }
}

#[cfg(test)]
mod extract_tests {
    use super::*;
    use crate::extract::{self, FileOutcome};
    use crate::input::PipelineConfig;
    use tempfile::tempdir;

    #[test]
    fn test_ghana_scenario_uniform_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        write_grid_file(&path, &GridFixture::ghana_cover(5.0)).unwrap();

        let config = PipelineConfig::default();
        let outcome = extract::process_grid_file(&path, &config).unwrap();
        let FileOutcome::Extracted(records) = outcome else {
            panic!("Expected extracted records");
        };

        // Only ghana intersects the fixture's coverage
        assert_eq!(records.len(), 1);
        let (country, record) = &records[0];
        assert_eq!(country, "ghana");
        assert_eq!(record.date, "2002-04-11");
        assert_eq!(record.mean, 5.0);
        assert_eq!(record.min, 5.0);
        assert_eq!(record.max, 5.0);
        assert_eq!(record.std, 0.0);

        // Inclusive selection: lat 4.5..11.5 and the full lon axis
        assert_eq!(record.raw_data.lats.len(), 8);
        assert_eq!(record.raw_data.lons.len(), 6);
        assert_eq!(record.raw_data.lats.first(), Some(&4.5));
        assert_eq!(record.raw_data.lats.last(), Some(&11.5));
        assert!(
            record
                .raw_data
                .values
                .iter()
                .flatten()
                .all(|v| *v == Some(5.0))
        );
    }

    #[test]
    fn test_all_fill_inside_box_yields_no_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        write_grid_file(&path, &GridFixture::ghana_cover(FILL)).unwrap();

        let config = PipelineConfig::default();
        let outcome = extract::process_grid_file(&path, &config).unwrap();
        let FileOutcome::Extracted(records) = outcome else {
            panic!("Expected extracted records");
        };
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_variable_skips_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        let mut fixture = GridFixture::ghana_cover(5.0);
        fixture.with_variable = false;
        write_grid_file(&path, &fixture).unwrap();

        let config = PipelineConfig::default();
        let outcome = extract::process_grid_file(&path, &config).unwrap();
        let FileOutcome::MissingVariable { available } = outcome else {
            panic!("Expected missing-variable outcome");
        };
        assert!(available.contains(&"lat".to_string()));
    }

    #[test]
    fn test_missing_directory_is_empty_result() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::default();

        let series = extract::process_directory(&dir.path().join("absent"), &config).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.values().all(|records| records.is_empty()));
    }

    #[test]
    fn test_directory_without_grid_files_is_empty_result() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a grid").unwrap();

        let config = PipelineConfig::default();
        let series = extract::process_directory(dir.path(), &config).unwrap();
        assert!(series.values().all(|records| records.is_empty()));
    }

    #[test]
    fn test_partial_fill_cells_become_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        let mut fixture = GridFixture::ghana_cover(5.0);
        // Poison one cell inside the ghana box: lat 4.5 (index 4), lon -3.5
        fixture.values[4 * fixture.lons.len()] = FILL;
        write_grid_file(&path, &fixture).unwrap();

        let config = PipelineConfig::default();
        let FileOutcome::Extracted(records) = extract::process_grid_file(&path, &config).unwrap()
        else {
            panic!("Expected extracted records");
        };
        let (_, record) = &records[0];

        assert_eq!(record.raw_data.values[0][0], None);
        assert_eq!(record.raw_data.values[0][1], Some(5.0));
        // Statistics ignore the poisoned cell
        assert_eq!(record.mean, 5.0);
        assert_eq!(record.std, 0.0);
    }

    #[test]
    fn test_bare_2d_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        let mut fixture = GridFixture::ghana_cover(7.5);
        fixture.time = None;
        write_grid_file(&path, &fixture).unwrap();

        let config = PipelineConfig::default();
        let FileOutcome::Extracted(records) = extract::process_grid_file(&path, &config).unwrap()
        else {
            panic!("Expected extracted records");
        };
        assert_eq!(records.len(), 1);
        let (_, record) = &records[0];
        assert_eq!(record.mean, 7.5);
        // Date came from the filename code since there is no time variable
        assert_eq!(record.date, "2002-04-05");
    }

    #[test]
    fn test_raw_values_round_trip_to_source_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GRD-3_2002095-2002120_GRAC.nc");
        let mut fixture = GridFixture::ghana_cover(0.0);
        let nlon = fixture.lons.len();
        for (i, lat) in fixture.lats.iter().enumerate() {
            for (j, lon) in fixture.lons.iter().enumerate() {
                fixture.values[i * nlon + j] = lat * 10.0 + lon;
            }
        }
        write_grid_file(&path, &fixture).unwrap();

        let config = PipelineConfig::default();
        let FileOutcome::Extracted(records) = extract::process_grid_file(&path, &config).unwrap()
        else {
            panic!("Expected extracted records");
        };
        let (_, record) = &records[0];

        for (i, lat) in record.raw_data.lats.iter().enumerate() {
            for (j, lon) in record.raw_data.lons.iter().enumerate() {
                let value = record.raw_data.values[i][j].unwrap();
                assert!((value - (lat * 10.0 + lon)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_record_count_bounded_by_file_count() {
        let dir = tempdir().unwrap();
        write_grid_file(
            &dir.path().join("GRD-3_2002095-2002120_GRAC.nc"),
            &GridFixture::ghana_cover(1.0),
        )
        .unwrap();
        let mut second = GridFixture::ghana_cover(2.0);
        second.time = Some(TimeAxis::Units {
            units: "days since 2002-01-01",
            value: 130.0,
        });
        write_grid_file(&dir.path().join("GRD-3_2002125-2002150_GRAC.nc"), &second).unwrap();

        let config = PipelineConfig::default();
        let series = extract::process_directory(dir.path(), &config).unwrap();
        assert_eq!(series["ghana"].len(), 2);
        assert_eq!(series["kenya"].len(), 0);
        assert_eq!(series["india"].len(), 0);
        // Files sort by name, so the record order is already chronological
        assert!(series["ghana"][0].date < series["ghana"][1].date);
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;
    use crate::extract::CountrySeries;
    use crate::output;
    use tempfile::tempdir;

    #[test]
    fn test_merge_concatenates_and_sorts_by_date() {
        let mut grace = CountrySeries::new();
        grace.insert(
            "ghana".to_string(),
            vec![sample_record("2002-05-01", 1.0), sample_record("2017-10-01", 2.0)],
        );
        let mut grace_fo = CountrySeries::new();
        grace_fo.insert(
            "ghana".to_string(),
            vec![sample_record("2018-06-01", 3.0), sample_record("2002-04-05", 4.0)],
        );

        let merged = output::merge_country_series(vec![grace, grace_fo]);
        let dates: Vec<&str> = merged["ghana"].iter().map(|r| r.date.as_str()).collect();
        assert_eq!(
            dates,
            vec!["2002-04-05", "2002-05-01", "2017-10-01", "2018-06-01"]
        );
    }

    #[test]
    fn test_write_skips_countries_without_records() {
        let dir = tempdir().unwrap();
        let mut series = CountrySeries::new();
        series.insert("ghana".to_string(), vec![sample_record("2002-04-05", 5.0)]);
        series.insert("kenya".to_string(), Vec::new());

        let written = output::write_country_series(dir.path(), &series).unwrap();
        assert_eq!(written.len(), 1);
        assert!(dir.path().join("ghana_groundwater.json").exists());
        assert!(!dir.path().join("kenya_groundwater.json").exists());
    }

    #[test]
    fn test_written_json_shape() {
        let dir = tempdir().unwrap();
        let mut series = CountrySeries::new();
        let mut record = sample_record("2002-04-05", 5.0);
        record.raw_data.values = vec![vec![Some(5.0), None]];
        record.raw_data.lons = vec![-0.5, 0.5];
        series.insert("ghana".to_string(), vec![record]);

        output::write_country_series(dir.path(), &series).unwrap();

        let content = std::fs::read_to_string(dir.path().join("ghana_groundwater.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let first = &parsed[0];
        assert_eq!(first["date"], "2002-04-05");
        assert_eq!(first["mean"], 5.0);
        assert_eq!(first["min"], 5.0);
        assert_eq!(first["max"], 5.0);
        assert_eq!(first["std"], 0.0);
        assert_eq!(first["raw_data"]["lats"][0], 5.5);
        assert_eq!(first["raw_data"]["values"][0][0], 5.0);
        assert!(first["raw_data"]["values"][0][1].is_null());
    }

    #[test]
    fn test_round_trip_through_serde() {
        let record = sample_record("2002-04-05", 5.0);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: CountryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.date, record.date);
        assert_eq!(parsed.raw_data.values, record.raw_data.values);
    }
}

#[cfg(test)]
mod fetch_tests {
    use crate::fetch;
    use crate::input::PipelineConfig;
    use tempfile::tempdir;

    #[test]
    fn test_downloader_args_layout() {
        let config = PipelineConfig::default();
        let args = fetch::downloader_args(&config.missions[0]);
        assert_eq!(
            args,
            vec![
                "-c",
                "TELLUS_GRAC_L3_JPL_RL06_LND_v04",
                "-d",
                "data/grace",
                "-sd",
                "2002-04-04T00:00:00Z",
                "-ed",
                "2017-10-18T00:00:00Z",
                "-e",
                ".nc",
            ]
        );
    }

    #[test]
    fn test_open_ended_mission_resolves_end_to_now() {
        let config = PipelineConfig::default();
        let args = fetch::downloader_args(&config.missions[1]);
        assert_eq!(args[6], "-ed");
        assert!(args[7].ends_with("T00:00:00Z"));
        assert!(args[7] > config.missions[1].start_date);
    }

    #[test]
    fn test_failed_download_is_non_fatal() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.downloader_bin = "grace2json-test-no-such-downloader".to_string();
        for (i, mission) in config.missions.iter_mut().enumerate() {
            mission.data_dir = dir.path().join(format!("mission{}", i));
        }

        // Must not panic, and must still create the target directories
        fetch::fetch_all(&config);
        assert!(dir.path().join("mission0").exists());
        assert!(dir.path().join("mission1").exists());
    }
}
