#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Collision record types and the closed enumerations they are built from.
//!
//! These are the canonical values every other crate speaks: the loader maps
//! raw dataset labels into them, the query layer parses dropdown selections
//! and free text into them, and the analytics layer groups by them.

mod records;
pub mod text;
pub mod vehicle;

pub use records::{Coordinates, CrashId, CrashRecord, PersonRecord};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One of the five NYC boroughs.
///
/// Declaration order is alphabetical, so the derived [`Ord`] sorts
/// boroughs the way charts list them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum Borough {
    #[strum(to_string = "BRONX", serialize = "THE BRONX")]
    Bronx,
    #[strum(to_string = "BROOKLYN")]
    Brooklyn,
    #[strum(to_string = "MANHATTAN")]
    Manhattan,
    #[strum(to_string = "QUEENS")]
    Queens,
    #[strum(to_string = "STATEN ISLAND", serialize = "STATEN_ISLAND")]
    StatenIsland,
}

impl Borough {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Bronx,
            Self::Brooklyn,
            Self::Manhattan,
            Self::Queens,
            Self::StatenIsland,
        ]
    }
}

/// Role of a person involved in a crash.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum PersonRole {
    #[strum(to_string = "Pedestrian")]
    Pedestrian,
    /// The dataset labels these as `Bicyclist`.
    #[strum(to_string = "Cyclist", serialize = "Bicyclist")]
    Cyclist,
    /// Drivers and passengers.
    #[strum(to_string = "Occupant", serialize = "Driver", serialize = "Passenger")]
    Occupant,
}

impl PersonRole {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pedestrian, Self::Cyclist, Self::Occupant]
    }
}

/// Injury outcome recorded for a person.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum PersonInjury {
    /// The dataset records these as `Unspecified`.
    #[strum(to_string = "Unharmed", serialize = "Unspecified")]
    Unharmed,
    #[strum(to_string = "Injured")]
    Injured,
    #[strum(to_string = "Killed")]
    Killed,
}

impl PersonInjury {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Unharmed, Self::Injured, Self::Killed]
    }
}

/// Canonical vehicle categories.
///
/// The dataset carries several hundred free-form vehicle labels; the loader
/// folds them into these with [`vehicle::categorize`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum VehicleCategory {
    #[strum(to_string = "Passenger Vehicle", serialize = "passenger_vehicle")]
    PassengerVehicle,
    #[strum(to_string = "Sport Utility Vehicle", serialize = "sport_utility_vehicle")]
    SportUtilityVehicle,
    #[strum(to_string = "Taxi")]
    Taxi,
    #[strum(to_string = "Van")]
    Van,
    #[strum(to_string = "Truck")]
    Truck,
    #[strum(to_string = "Bus")]
    Bus,
    #[strum(to_string = "Motorcycle")]
    Motorcycle,
    #[strum(to_string = "Bicycle")]
    Bicycle,
    #[strum(to_string = "E-Bike", serialize = "e_bike")]
    EBike,
    #[strum(to_string = "E-Scooter", serialize = "e_scooter")]
    EScooter,
    #[strum(to_string = "Emergency Vehicle", serialize = "emergency_vehicle")]
    EmergencyVehicle,
    #[strum(to_string = "Other")]
    Other,
}

impl VehicleCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PassengerVehicle,
            Self::SportUtilityVehicle,
            Self::Taxi,
            Self::Van,
            Self::Truck,
            Self::Bus,
            Self::Motorcycle,
            Self::Bicycle,
            Self::EBike,
            Self::EScooter,
            Self::EmergencyVehicle,
            Self::Other,
        ]
    }
}

/// Crash severity derived from its injury and fatality counts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No injuries and no fatalities.
    #[strum(to_string = "Property Damage")]
    PropertyDamage,
    /// At least one injury, no fatalities.
    #[strum(to_string = "Injury")]
    Injury,
    /// At least one fatality.
    #[strum(to_string = "Fatal")]
    Fatal,
}

impl Severity {
    /// Classifies a crash from its counts.
    #[must_use]
    pub const fn classify(injured: u32, killed: u32) -> Self {
        if killed > 0 {
            Self::Fatal
        } else if injured > 0 {
            Self::Injury
        } else {
            Self::PropertyDamage
        }
    }

    /// Whether this counts as a severe crash (anyone hurt or killed).
    #[must_use]
    pub const fn is_severe(self) -> bool {
        matches!(self, Self::Injury | Self::Fatal)
    }
}

/// Meteorological season, in calendar order starting from winter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Maps a calendar month (1-12) to its season. December belongs to
    /// winter.
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Fall,
            _ => Self::Winter,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Winter, Self::Spring, Self::Summer, Self::Fall]
    }
}

/// Daytime (06:00-17:59) or nighttime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Day,
    Night,
}

impl DayPeriod {
    /// First hour counted as daytime.
    pub const DAY_START_HOUR: u32 = 6;
    /// First hour counted as nighttime.
    pub const NIGHT_START_HOUR: u32 = 18;

    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        if hour >= Self::DAY_START_HOUR && hour < Self::NIGHT_START_HOUR {
            Self::Day
        } else {
            Self::Night
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Day, Self::Night]
    }
}

/// Age bands used for the vulnerability breakdown.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    #[strum(to_string = "0-17")]
    Under18,
    #[strum(to_string = "18-24")]
    From18To24,
    #[strum(to_string = "25-34")]
    From25To34,
    #[strum(to_string = "35-44")]
    From35To44,
    #[strum(to_string = "45-54")]
    From45To54,
    #[strum(to_string = "55-64")]
    From55To64,
    #[strum(to_string = "65+")]
    From65,
}

impl AgeBucket {
    /// Oldest age still considered a plausible recording.
    pub const MAX_PLAUSIBLE_AGE: u16 = 119;

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Under18,
            Self::From18To24,
            Self::From25To34,
            Self::From35To44,
            Self::From45To54,
            Self::From55To64,
            Self::From65,
        ]
    }

    /// Buckets an age. Zero and implausibly large ages are data-entry
    /// placeholders and bucket as `None`.
    #[must_use]
    pub const fn from_age(age: u16) -> Option<Self> {
        match age {
            0 => None,
            1..=17 => Some(Self::Under18),
            18..=24 => Some(Self::From18To24),
            25..=34 => Some(Self::From25To34),
            35..=44 => Some(Self::From35To44),
            45..=54 => Some(Self::From45To54),
            55..=64 => Some(Self::From55To64),
            65..=Self::MAX_PLAUSIBLE_AGE => Some(Self::From65),
            _ => None,
        }
    }
}

/// Number of vehicles involved in a crash, capped at four.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCountBucket {
    #[strum(to_string = "1")]
    One,
    #[strum(to_string = "2")]
    Two,
    #[strum(to_string = "3")]
    Three,
    #[strum(to_string = "4+")]
    FourOrMore,
}

impl VehicleCountBucket {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::One, Self::Two, Self::Three, Self::FourOrMore]
    }

    /// Returns `None` for crashes with no vehicles recorded.
    #[must_use]
    pub const fn from_count(count: u32) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => Some(Self::FourOrMore),
        }
    }
}

/// Inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRange {
    /// First year in the range.
    pub start: i32,
    /// Last year in the range (inclusive).
    pub end: i32,
}

impl YearRange {
    /// Creates a range, swapping the bounds if they are reversed.
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// A range covering exactly one year.
    #[must_use]
    pub const fn single(year: i32) -> Self {
        Self {
            start: year,
            end: year,
        }
    }

    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    /// Whether every year of `other` lies within this range.
    #[must_use]
    pub const fn covers(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Returns the overlap of two ranges, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self { start, end })
    }

    /// Iterates the years in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn borough_parses_dataset_labels() {
        assert_eq!(
            Borough::from_str("STATEN ISLAND").unwrap(),
            Borough::StatenIsland
        );
        assert_eq!(Borough::from_str("brooklyn").unwrap(), Borough::Brooklyn);
        assert_eq!(Borough::from_str("the bronx").unwrap(), Borough::Bronx);
        assert!(Borough::from_str("Hoboken").is_err());
    }

    #[test]
    fn borough_display_roundtrips() {
        for borough in Borough::all() {
            assert_eq!(Borough::from_str(&borough.to_string()).unwrap(), *borough);
        }
    }

    #[test]
    fn boroughs_sort_alphabetically() {
        let mut labels: Vec<String> = Borough::all().iter().map(ToString::to_string).collect();
        let declared = labels.clone();
        labels.sort();
        assert_eq!(labels, declared);
    }

    #[test]
    fn person_role_accepts_dataset_aliases() {
        assert_eq!(
            PersonRole::from_str("Bicyclist").unwrap(),
            PersonRole::Cyclist
        );
        assert_eq!(PersonRole::from_str("driver").unwrap(), PersonRole::Occupant);
        assert_eq!(
            PersonInjury::from_str("Unspecified").unwrap(),
            PersonInjury::Unharmed
        );
    }

    #[test]
    fn severity_classification() {
        assert_eq!(Severity::classify(0, 0), Severity::PropertyDamage);
        assert_eq!(Severity::classify(2, 0), Severity::Injury);
        assert_eq!(Severity::classify(2, 1), Severity::Fatal);
        assert!(!Severity::PropertyDamage.is_severe());
        assert!(Severity::Fatal.is_severe());
    }

    #[test]
    fn seasons_cover_every_month() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(11), Season::Fall);
    }

    #[test]
    fn day_period_boundaries() {
        assert_eq!(DayPeriod::from_hour(5), DayPeriod::Night);
        assert_eq!(DayPeriod::from_hour(6), DayPeriod::Day);
        assert_eq!(DayPeriod::from_hour(17), DayPeriod::Day);
        assert_eq!(DayPeriod::from_hour(18), DayPeriod::Night);
    }

    #[test]
    fn age_buckets_reject_placeholders() {
        assert_eq!(AgeBucket::from_age(0), None);
        assert_eq!(AgeBucket::from_age(17), Some(AgeBucket::Under18));
        assert_eq!(AgeBucket::from_age(18), Some(AgeBucket::From18To24));
        assert_eq!(AgeBucket::from_age(119), Some(AgeBucket::From65));
        assert_eq!(AgeBucket::from_age(120), None);
    }

    #[test]
    fn vehicle_count_buckets() {
        assert_eq!(VehicleCountBucket::from_count(0), None);
        assert_eq!(
            VehicleCountBucket::from_count(7),
            Some(VehicleCountBucket::FourOrMore)
        );
    }

    #[test]
    fn year_range_normalizes_and_intersects() {
        let range = YearRange::new(2021, 2018);
        assert_eq!(range, YearRange { start: 2018, end: 2021 });
        assert_eq!(range.years().count(), 4);
        assert_eq!(range.to_string(), "2018-2021");
        assert_eq!(YearRange::single(2020).to_string(), "2020");
        assert_eq!(
            range.intersect(&YearRange::new(2020, 2030)),
            Some(YearRange::new(2020, 2021))
        );
        assert_eq!(range.intersect(&YearRange::single(2010)), None);
        assert!(YearRange::new(2015, 2025).covers(&range));
    }
}
