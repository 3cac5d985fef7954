//! CSV loading for the crash-level and person-level datasets.
//!
//! Both files may be plain CSV or gzip-compressed (`.gz` extension). Rows are
//! deserialized into raw string structs keyed by the dataset's column headers
//! and then converted into typed records. Identifiers and counts are strict
//! and abort the load when unparseable. Rows with unusable dates or person
//! labels are skipped and counted. A crash with an unusable time is kept
//! without one, so it still counts everywhere except the day/night split.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr as _;

use chrono::{Datelike as _, NaiveDate, NaiveTime};
use crash_dash_collision_models::{
    Borough, Coordinates, CrashId, CrashRecord, PersonInjury, PersonRecord, PersonRole,
    VehicleCategory, YearRange, vehicle,
};
use serde::Deserialize;

use crate::{DatasetStore, StoreError};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

#[derive(Debug, Deserialize)]
struct RawCrash {
    #[serde(rename = "COLLISION_ID")]
    collision_id: String,
    #[serde(rename = "CRASH DATE", default)]
    crash_date: String,
    #[serde(rename = "CRASH TIME", default)]
    crash_time: String,
    #[serde(rename = "BOROUGH", default)]
    borough: String,
    #[serde(rename = "LATITUDE", default)]
    latitude: String,
    #[serde(rename = "LONGITUDE", default)]
    longitude: String,
    #[serde(rename = "NUMBER OF PERSONS INJURED", default)]
    injured: String,
    #[serde(rename = "NUMBER OF PERSONS KILLED", default)]
    killed: String,
    #[serde(rename = "CONTRIBUTING FACTOR VEHICLE 1", default)]
    factor_1: String,
    #[serde(rename = "CONTRIBUTING FACTOR VEHICLE 2", default)]
    factor_2: String,
    #[serde(rename = "CONTRIBUTING FACTOR VEHICLE 3", default)]
    factor_3: String,
    #[serde(rename = "CONTRIBUTING FACTOR VEHICLE 4", default)]
    factor_4: String,
    #[serde(rename = "CONTRIBUTING FACTOR VEHICLE 5", default)]
    factor_5: String,
    #[serde(rename = "VEHICLE TYPE CODE 1", default)]
    vehicle_1: String,
    #[serde(rename = "VEHICLE TYPE CODE 2", default)]
    vehicle_2: String,
    #[serde(rename = "VEHICLE TYPE CODE 3", default)]
    vehicle_3: String,
    #[serde(rename = "VEHICLE TYPE CODE 4", default)]
    vehicle_4: String,
    #[serde(rename = "VEHICLE TYPE CODE 5", default)]
    vehicle_5: String,
}

#[derive(Debug, Deserialize)]
struct RawPerson {
    #[serde(rename = "COLLISION_ID")]
    collision_id: String,
    #[serde(rename = "CRASH DATE", default)]
    crash_date: String,
    #[serde(rename = "PERSON_TYPE", default)]
    person_type: String,
    #[serde(rename = "PERSON_AGE", default)]
    person_age: String,
    #[serde(rename = "PERSON_INJURY", default)]
    person_injury: String,
}

/// Rows dropped while reading one file, by reason.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkippedRows {
    /// Date missing or unparseable.
    pub unparseable: u64,
    /// Crash year outside the load window.
    pub out_of_window: u64,
    /// Person type or injury outside the known enumerations.
    pub unknown_label: u64,
}

impl SkippedRows {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.unparseable + self.out_of_window + self.unknown_label
    }
}

/// Loads both datasets and builds the store.
///
/// Rows whose crash year lies outside `window` are skipped.
///
/// # Errors
///
/// * [`StoreError::Io`] if a file cannot be opened or decompressed
/// * [`StoreError::Csv`] if a file is not valid CSV
/// * [`StoreError::Malformed`] if a crash identifier or count is not numeric
/// * [`StoreError::DuplicateCrash`] if two crash rows share an identifier
pub fn load_store(
    crash_path: &Path,
    person_path: &Path,
    window: YearRange,
) -> Result<DatasetStore, StoreError> {
    log::info!("Loading crashes from {}", crash_path.display());
    let (crashes, skipped) = read_crashes(open(crash_path)?, window)?;
    log::info!(
        "Loaded {} crashes ({} rows skipped: {skipped:?})",
        crashes.len(),
        skipped.total()
    );

    log::info!("Loading persons from {}", person_path.display());
    let (persons, skipped) = read_persons(open(person_path)?, window)?;
    log::info!(
        "Loaded {} person records ({} rows skipped: {skipped:?})",
        persons.len(),
        skipped.total()
    );

    DatasetStore::new(crashes, persons)
}

/// Opens a dataset file, transparently decompressing `.gz` files.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be opened.
pub fn open(path: &Path) -> Result<Box<dyn Read>, StoreError> {
    let file = BufReader::new(File::open(path)?);
    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    if gzipped {
        log::debug!("Decompressing {}", path.display());
        Ok(Box::new(flate2::read::GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Reads crash rows from CSV.
///
/// # Errors
///
/// Returns [`StoreError::Csv`] on invalid CSV and [`StoreError::Malformed`]
/// on a non-numeric identifier or count.
pub fn read_crashes<R: Read>(
    reader: R,
    window: YearRange,
) -> Result<(Vec<CrashRecord>, SkippedRows), StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut crashes = Vec::new();
    let mut skipped = SkippedRows::default();

    for (i, result) in reader.deserialize::<RawCrash>().enumerate() {
        let raw = result?;
        let row = i as u64 + 1;

        let Some(date) = parse_date(&raw.crash_date) else {
            skipped.unparseable += 1;
            continue;
        };
        if !window.contains(date.year()) {
            skipped.out_of_window += 1;
            continue;
        }

        let vehicles = [
            raw.vehicle_1.as_str(),
            raw.vehicle_2.as_str(),
            raw.vehicle_3.as_str(),
            raw.vehicle_4.as_str(),
            raw.vehicle_5.as_str(),
        ];

        crashes.push(CrashRecord {
            id: parse_id(row, &raw.collision_id)?,
            borough: parse_borough(&raw.borough),
            date,
            time: parse_time(&raw.crash_time),
            location: parse_coordinate(&raw.latitude)
                .zip(parse_coordinate(&raw.longitude))
                .and_then(|(lat, lon)| Coordinates::new(lat, lon)),
            contributing_factors: factors(&[
                raw.factor_1.as_str(),
                raw.factor_2.as_str(),
                raw.factor_3.as_str(),
                raw.factor_4.as_str(),
                raw.factor_5.as_str(),
            ]),
            vehicle_types: vehicle_types(&vehicles),
            injured: parse_count(row, "NUMBER OF PERSONS INJURED", &raw.injured)?,
            killed: parse_count(row, "NUMBER OF PERSONS KILLED", &raw.killed)?,
            vehicles_involved: vehicles_involved(&vehicles),
        });
    }

    Ok((crashes, skipped))
}

/// Reads person rows from CSV.
///
/// # Errors
///
/// Returns [`StoreError::Csv`] on invalid CSV and [`StoreError::Malformed`]
/// on a non-numeric crash identifier.
pub fn read_persons<R: Read>(
    reader: R,
    window: YearRange,
) -> Result<(Vec<PersonRecord>, SkippedRows), StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut persons = Vec::new();
    let mut skipped = SkippedRows::default();

    for (i, result) in reader.deserialize::<RawPerson>().enumerate() {
        let raw = result?;
        let row = i as u64 + 1;

        let Some(date) = parse_date(&raw.crash_date) else {
            skipped.unparseable += 1;
            continue;
        };
        if !window.contains(date.year()) {
            skipped.out_of_window += 1;
            continue;
        }

        let (Ok(role), Ok(injury)) = (
            PersonRole::from_str(&raw.person_type),
            PersonInjury::from_str(&raw.person_injury),
        ) else {
            log::trace!(
                "Skipping person row {row} with type '{}' and injury '{}'",
                raw.person_type,
                raw.person_injury
            );
            skipped.unknown_label += 1;
            continue;
        };

        persons.push(PersonRecord {
            crash_id: parse_id(row, &raw.collision_id)?,
            role,
            age: parse_age(&raw.person_age),
            injury,
        });
    }

    Ok((persons, skipped))
}

/// Accepts `YYYY-MM-DD` and `MM/DD/YYYY`, optionally followed by a time
/// component (`2021-07-04T00:00:00.000`).
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(head, format).ok())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

fn parse_id(row: u64, raw: &str) -> Result<CrashId, StoreError> {
    raw.parse().map_err(|_| StoreError::Malformed {
        row,
        column: "COLLISION_ID",
        value: raw.to_owned(),
    })
}

fn parse_borough(raw: &str) -> Option<Borough> {
    if raw.is_empty() {
        return None;
    }
    let borough = Borough::from_str(raw).ok();
    if borough.is_none() {
        log::debug!("Unrecognized borough '{raw}', treating as unattributed");
    }
    borough
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.parse().ok()
}

/// Counts are exported as floats (`"1.0"`) by some tools. Blank means zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_count(row: u64, column: &'static str, raw: &str) -> Result<u32, StoreError> {
    if raw.is_empty() {
        return Ok(0);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value.min(f64::from(u32::MAX)) as u32),
        _ => Err(StoreError::Malformed {
            row,
            column,
            value: raw.to_owned(),
        }),
    }
}

/// Non-numeric and negative ages are treated as not recorded.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_age(raw: &str) -> Option<u16> {
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value <= f64::from(u16::MAX)).then_some(value as u16)
}

/// Keeps factor positions so the first column stays the primary factor.
/// Trailing blanks are dropped.
fn factors(raw: &[&str]) -> Vec<String> {
    let mut factors: Vec<String> = raw.iter().map(|f| (*f).to_owned()).collect();
    while factors.last().is_some_and(String::is_empty) {
        factors.pop();
    }
    factors
}

fn vehicle_types(raw: &[&str]) -> Vec<VehicleCategory> {
    let mut categories = Vec::new();
    for category in raw.iter().filter_map(|v| vehicle::categorize(v)) {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

fn vehicles_involved(raw: &[&str]) -> u32 {
    u32::try_from(raw.iter().filter(|v| !v.is_empty()).count()).unwrap_or(u32::MAX)
}
