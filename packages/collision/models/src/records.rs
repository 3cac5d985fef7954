use std::collections::BTreeSet;

use chrono::{Datelike as _, NaiveDate, NaiveTime, Timelike as _};
use serde::{Deserialize, Serialize};

use crate::{
    AgeBucket, Borough, DayPeriod, PersonInjury, PersonRole, Season, Severity, VehicleCategory,
    VehicleCountBucket,
};

/// Identifier shared by a crash and every person involved in it.
pub type CrashId = u64;

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` for the `(0, 0)` placeholder and non-finite values
    /// the dataset uses when a crash was never geocoded.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// One row of the crash-level dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashRecord {
    /// Unique crash identifier.
    pub id: CrashId,
    /// Borough, when the crash was attributed to one.
    pub borough: Option<Borough>,
    pub date: NaiveDate,
    /// Time of day, when the export's value was usable.
    pub time: Option<NaiveTime>,
    pub location: Option<Coordinates>,
    /// Contributing factors in vehicle order. The first is the primary one.
    pub contributing_factors: Vec<String>,
    /// Vehicle categories involved, first-seen order, no duplicates.
    pub vehicle_types: Vec<VehicleCategory>,
    /// Number of persons injured.
    pub injured: u32,
    /// Number of persons killed.
    pub killed: u32,
    /// Number of vehicles involved.
    pub vehicles_involved: u32,
}

impl CrashRecord {
    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    #[must_use]
    pub fn season(&self) -> Season {
        Season::from_month(self.date.month())
    }

    #[must_use]
    pub fn day_period(&self) -> Option<DayPeriod> {
        self.time.map(|time| DayPeriod::from_hour(time.hour()))
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        Severity::classify(self.injured, self.killed)
    }

    #[must_use]
    pub const fn is_severe(&self) -> bool {
        self.severity().is_severe()
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.killed > 0
    }

    /// The first non-blank contributing factor.
    #[must_use]
    pub fn primary_factor(&self) -> Option<&str> {
        self.contributing_factors
            .first()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    }

    #[must_use]
    pub fn primary_vehicle(&self) -> Option<VehicleCategory> {
        self.vehicle_types.first().copied()
    }

    /// Whether any vehicle involved belongs to one of `categories`.
    #[must_use]
    pub fn involves_any(&self, categories: &BTreeSet<VehicleCategory>) -> bool {
        self.vehicle_types.iter().any(|v| categories.contains(v))
    }

    #[must_use]
    pub const fn vehicle_count_bucket(&self) -> Option<VehicleCountBucket> {
        VehicleCountBucket::from_count(self.vehicles_involved)
    }
}

/// One row of the person-level dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    /// The crash this person was involved in.
    pub crash_id: CrashId,
    pub role: PersonRole,
    pub age: Option<u16>,
    pub injury: PersonInjury,
}

impl PersonRecord {
    #[must_use]
    pub fn age_bucket(&self) -> Option<AgeBucket> {
        self.age.and_then(AgeBucket::from_age)
    }

    /// Whether the person was injured or killed.
    #[must_use]
    pub const fn is_harmed(&self) -> bool {
        matches!(self.injury, PersonInjury::Injured | PersonInjury::Killed)
    }
}
