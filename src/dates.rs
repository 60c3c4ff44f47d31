//! Observation-date resolution for grid files.
//!
//! A grid file's date comes from the first step of a fixed ladder that
//! succeeds: the `time` variable decoded through its CF units attribute, the
//! raw `time` value as a day offset from a fixed epoch, a date code in the
//! filename, and finally a flagged placeholder. No step ever aborts file
//! processing; a failed step cascades to the next one.

use chrono::{Duration, NaiveDate};
use std::path::Path;

/// Which step of the resolution ladder produced a file's observation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// `time` variable decoded through its `"days since <date>"` units attribute
    TimeUnits,
    /// Raw `time` value taken as a day offset from the 2002-01-01 epoch
    EpochOffset,
    /// `YYYYDDD` or `YYYYMM` code parsed out of the filename
    Filename,
    /// Nothing decodable; fixed placeholder date
    Fallback,
}

impl DateSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DateSource::Fallback)
    }
}

/// Epoch used when a time variable carries no usable units attribute.
pub fn offset_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 1, 1).unwrap()
}

/// Placeholder for files whose date cannot be resolved at all.
///
/// Records stamped with this date are misplaced in the output ordering, so
/// callers must surface `DateSource::Fallback` as a data-quality diagnostic.
pub fn fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Resolves the observation date for one grid file.
///
/// Returns the date together with the ladder step that produced it so the
/// caller can flag placeholder dates.
pub fn resolve_observation_date(
    file: &netcdf::File,
    path: &Path,
    time_name: &str,
) -> (NaiveDate, DateSource) {
    if let Some(var) = file.variable(time_name)
        && let Some(value) = first_time_value(&var)
    {
        if let Some(reference) = units_reference_date(&var)
            && let Some(date) = add_days(reference, value)
        {
            return (date, DateSource::TimeUnits);
        }
        if let Some(date) = add_days(offset_epoch(), value) {
            return (date, DateSource::EpochOffset);
        }
    }
    if let Some(date) = date_from_filename(path) {
        return (date, DateSource::Filename);
    }
    (fallback_date(), DateSource::Fallback)
}

/// Parses a date code out of a grid file name.
///
/// The stem is split on `_` and `-`; the first token with seven or more
/// leading digits is decoded as `YYYYDDD`, and an all-digit six-character
/// token as `YYYYMM` (first of the month), covering both the
/// `GRD-3_YYYYDDD-YYYYDDD_...` and `GRCTellus-YYYYMM-...` naming conventions.
pub fn date_from_filename(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".nc").unwrap_or(name);
    for token in stem.split(['_', '-']) {
        let digit_count = token.chars().take_while(|c| c.is_ascii_digit()).count();
        if digit_count >= 7 {
            if let Some(date) = parse_yyyyddd(&token[..7]) {
                return Some(date);
            }
        } else if digit_count == 6 && token.len() == 6 {
            if let Some(date) = parse_yyyymm(token) {
                return Some(date);
            }
        }
    }
    None
}

fn first_time_value(var: &netcdf::Variable) -> Option<f64> {
    let values = var.get_values::<f64, _>(..).ok()?;
    let value = values.first().copied()?;
    value.is_finite().then_some(value)
}

/// Reads a CF-style `"days since <date>"` units attribute off a time variable.
fn units_reference_date(var: &netcdf::Variable) -> Option<NaiveDate> {
    let attr = var.attribute("units")?;
    let units = match attr.value().ok()? {
        netcdf::AttributeValue::Str(s) => s,
        _ => return None,
    };
    let rest = units.trim().strip_prefix("days since ")?;
    let date_part = rest.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn add_days(reference: NaiveDate, days: f64) -> Option<NaiveDate> {
    // Guard before Duration construction; anything near the cap is garbage
    // time data anyway.
    if !days.is_finite() || days.abs() > 1.0e7 {
        return None;
    }
    let seconds = (days * 86_400.0) as i64;
    reference.checked_add_signed(Duration::seconds(seconds))
}

fn parse_yyyyddd(code: &str) -> Option<NaiveDate> {
    let year = code[..4].parse::<i32>().ok()?;
    let doy = code[4..7].parse::<u32>().ok()?;
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_yo_opt(year, doy)
}

fn parse_yyyymm(code: &str) -> Option<NaiveDate> {
    let year = code[..4].parse::<i32>().ok()?;
    let month = code[4..6].parse::<u32>().ok()?;
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}
