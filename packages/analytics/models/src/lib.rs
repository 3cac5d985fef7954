#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the collision dashboard.
//!
//! Every chart is an [`AggregateResult`]: the [`Question`] it answers, the
//! dimensions it groups by, and an ordered list of groups each carrying a
//! [`Metric`]. A [`DashboardResults`] bundles the ten results with the
//! summary block and the filter that produced them.

use std::collections::BTreeMap;

use crash_dash_collision_models::{
    AgeBucket, Borough, Coordinates, DayPeriod, PersonInjury, PersonRole, Season, Severity,
    VehicleCategory, VehicleCountBucket,
};
use crash_dash_query_models::{Filter, FilterRequest};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Inbound dashboard request: four dropdown selections plus search text.
pub type DashboardRequest = FilterRequest;

/// Which dataset an aggregation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Population {
    Crashes,
    Persons,
}

/// How an aggregation measures each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    /// Number of records in the group.
    Count,
    /// Share of the group's records satisfying the question's predicate.
    Rate,
}

/// A grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Dimension {
    Year,
    Borough,
    Role,
    Injury,
    Factor,
    Vehicle,
    Severity,
    Cell,
    DayPeriod,
    AgeBucket,
    VehicleCount,
    Season,
}

/// The ten research questions, in dashboard order.
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
#[strum(serialize_all = "snake_case")]
pub enum Question {
    /// Crash counts per year and borough.
    TemporalTrend,
    /// Share of crashes with an injury or fatality, per borough.
    SeverityByBorough,
    /// Persons by role and injury outcome.
    VictimTypes,
    /// Share of fatal crashes per primary contributing factor.
    FactorFatality,
    /// Crashes by primary vehicle and severity.
    VehicleSeverity,
    /// Crash counts per coordinate grid cell.
    SpatialHotspots,
    /// Share of severe crashes by day and night.
    DayNightSeverity,
    /// Share of persons harmed, per age bucket and role.
    AgeVulnerability,
    /// Share of severe crashes by number of vehicles involved.
    MultiVehicleSeverity,
    /// Share of severe crashes per season.
    SeasonalSeverity,
}

impl Question {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TemporalTrend,
            Self::SeverityByBorough,
            Self::VictimTypes,
            Self::FactorFatality,
            Self::VehicleSeverity,
            Self::SpatialHotspots,
            Self::DayNightSeverity,
            Self::AgeVulnerability,
            Self::MultiVehicleSeverity,
            Self::SeasonalSeverity,
        ]
    }

    /// Chart title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::TemporalTrend => "Crashes per Year by Borough",
            Self::SeverityByBorough => "Severe Crash Rate by Borough",
            Self::VictimTypes => "Victim Types by Injury Outcome",
            Self::FactorFatality => "Fatality Rate by Contributing Factor",
            Self::VehicleSeverity => "Crash Severity by Vehicle Type",
            Self::SpatialHotspots => "Crash Hotspots",
            Self::DayNightSeverity => "Severe Crash Rate, Day vs Night",
            Self::AgeVulnerability => "Harm Rate by Age and Role",
            Self::MultiVehicleSeverity => "Severe Crash Rate by Vehicles Involved",
            Self::SeasonalSeverity => "Severe Crash Rate by Season",
        }
    }

    #[must_use]
    pub const fn population(self) -> Population {
        match self {
            Self::VictimTypes | Self::AgeVulnerability => Population::Persons,
            _ => Population::Crashes,
        }
    }

    #[must_use]
    pub const fn metric_kind(self) -> MetricKind {
        match self {
            Self::TemporalTrend
            | Self::VictimTypes
            | Self::VehicleSeverity
            | Self::SpatialHotspots => MetricKind::Count,
            _ => MetricKind::Rate,
        }
    }

    /// Grouping dimensions, in group-key order.
    #[must_use]
    pub const fn dimensions(self) -> &'static [Dimension] {
        match self {
            Self::TemporalTrend => &[Dimension::Year, Dimension::Borough],
            Self::SeverityByBorough => &[Dimension::Borough],
            Self::VictimTypes => &[Dimension::Role, Dimension::Injury],
            Self::FactorFatality => &[Dimension::Factor],
            Self::VehicleSeverity => &[Dimension::Vehicle, Dimension::Severity],
            Self::SpatialHotspots => &[Dimension::Cell],
            Self::DayNightSeverity => &[Dimension::DayPeriod],
            Self::AgeVulnerability => &[Dimension::AgeBucket, Dimension::Role],
            Self::MultiVehicleSeverity => &[Dimension::VehicleCount],
            Self::SeasonalSeverity => &[Dimension::Season],
        }
    }
}

/// Side length of a hotspot grid cell, held in micro-degrees so cells
/// compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridResolution {
    micros: i64,
}

impl GridResolution {
    /// Default cell size: 0.01 degrees (roughly 1.1 km north-south).
    pub const DEFAULT_DEGREES: f64 = 0.01;

    /// Returns `None` unless `degrees` is finite, at least one
    /// micro-degree and at most 360.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() || !(0.000_001..=360.0).contains(&degrees) {
            return None;
        }
        Some(Self {
            micros: (degrees * 1_000_000.0).round() as i64,
        })
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn degrees(self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    /// The cell containing `point`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell(self, point: &Coordinates) -> GridCell {
        let snap = |degrees: f64| {
            let micros = (degrees * 1_000_000.0).round() as i64;
            micros.div_euclid(self.micros) * self.micros
        };
        GridCell {
            south_micros: snap(point.latitude),
            west_micros: snap(point.longitude),
        }
    }
}

impl Default for GridResolution {
    fn default() -> Self {
        Self { micros: 10_000 }
    }
}

/// A hotspot grid cell, identified by its south-west corner in
/// micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub south_micros: i64,
    pub west_micros: i64,
}

impl GridCell {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn south(&self) -> f64 {
        self.south_micros as f64 / 1_000_000.0
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn west(&self) -> f64 {
        self.west_micros as f64 / 1_000_000.0
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.south(), self.west())
    }
}

/// One component of a group key.
///
/// Variants compare in declaration order, so [`KeyPart::Other`] and
/// [`KeyPart::Unknown`] sort after every real value of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "snake_case")]
pub enum KeyPart {
    Year(i32),
    Borough(Borough),
    Role(PersonRole),
    Injury(PersonInjury),
    Factor(String),
    Vehicle(VehicleCategory),
    Severity(Severity),
    Cell(GridCell),
    DayPeriod(DayPeriod),
    AgeBucket(AgeBucket),
    VehicleCount(VehicleCountBucket),
    Season(Season),
    /// Groups folded together by [`AggregateResult::top_n`].
    Other,
    /// The record has no value for this dimension.
    Unknown,
}

impl KeyPart {
    /// Maps a missing value to [`KeyPart::Unknown`].
    pub fn or_unknown<T>(value: Option<T>, part: impl FnOnce(T) -> Self) -> Self {
        value.map_or(Self::Unknown, part)
    }
}

impl std::fmt::Display for KeyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year}"),
            Self::Borough(borough) => write!(f, "{borough}"),
            Self::Role(role) => write!(f, "{role}"),
            Self::Injury(injury) => write!(f, "{injury}"),
            Self::Factor(factor) => write!(f, "{factor}"),
            Self::Vehicle(vehicle) => write!(f, "{vehicle}"),
            Self::Severity(severity) => write!(f, "{severity}"),
            Self::Cell(cell) => write!(f, "{cell}"),
            Self::DayPeriod(period) => write!(f, "{period}"),
            Self::AgeBucket(bucket) => write!(f, "{bucket}"),
            Self::VehicleCount(count) => write!(f, "{count}"),
            Self::Season(season) => write!(f, "{season}"),
            Self::Other => write!(f, "Other"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Ordered key of one group, one part per dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

impl<const N: usize> From<[KeyPart; N]> for GroupKey {
    fn from(parts: [KeyPart; N]) -> Self {
        Self(parts.into())
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " / ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Measurement of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Metric {
    Count {
        count: u64,
    },
    Rate {
        /// Records in the group satisfying the predicate.
        numerator: u64,
        /// Records in the group.
        denominator: u64,
        /// `numerator / denominator`, or `None` when the group is empty.
        value: Option<f64>,
    },
}

impl Metric {
    #[must_use]
    pub const fn count(count: u64) -> Self {
        Self::Count { count }
    }

    /// A rate. An empty group has an undefined (`None`) value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(numerator: u64, denominator: u64) -> Self {
        Self::Rate {
            numerator,
            denominator,
            value: (denominator > 0).then(|| numerator as f64 / denominator as f64),
        }
    }

    /// Records the group covers: the count, or the rate's denominator.
    #[must_use]
    pub const fn weight(&self) -> u64 {
        match self {
            Self::Count { count } => *count,
            Self::Rate { denominator, .. } => *denominator,
        }
    }

    #[must_use]
    pub const fn numerator(&self) -> u64 {
        match self {
            Self::Count { count } => *count,
            Self::Rate { numerator, .. } => *numerator,
        }
    }

    /// The rate value, if this is a defined rate.
    #[must_use]
    pub const fn rate_value(&self) -> Option<f64> {
        match self {
            Self::Count { .. } => None,
            Self::Rate { value, .. } => *value,
        }
    }
}

/// One group of an aggregate result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub key: GroupKey,
    pub metric: Metric,
}

/// Result of one research question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub question: Question,
    /// Names of the group key components.
    pub dimensions: Vec<Dimension>,
    /// Groups in ascending key order.
    pub groups: Vec<Group>,
}

impl AggregateResult {
    /// An empty result for `question`.
    #[must_use]
    pub fn empty(question: Question) -> Self {
        Self {
            question,
            dimensions: question.dimensions().to_vec(),
            groups: Vec::new(),
        }
    }

    /// Number of records the groups partition: the sum of counts, or of
    /// rate denominators.
    #[must_use]
    pub fn population(&self) -> u64 {
        self.groups.iter().map(|g| g.metric.weight()).sum()
    }

    #[must_use]
    pub fn group(&self, key: &GroupKey) -> Option<&Metric> {
        self.groups.iter().find(|g| &g.key == key).map(|g| &g.metric)
    }

    /// Keeps the `n` groups covering the most records, largest first, and
    /// folds the rest into one trailing [`KeyPart::Other`] group.
    ///
    /// The population is preserved.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Self {
        let mut groups = self.groups.clone();
        groups.sort_by(|a, b| {
            b.metric
                .weight()
                .cmp(&a.metric.weight())
                .then_with(|| a.key.cmp(&b.key))
        });

        if groups.len() > n {
            let rest = groups.split_off(n);
            let numerator = rest.iter().map(|g| g.metric.numerator()).sum();
            let weight = rest.iter().map(|g| g.metric.weight()).sum();
            let metric = match self.question.metric_kind() {
                MetricKind::Count => Metric::count(weight),
                MetricKind::Rate => Metric::rate(numerator, weight),
            };
            let other = vec![KeyPart::Other; self.dimensions.len().max(1)];
            groups.push(Group {
                key: GroupKey(other),
                metric,
            });
        }

        Self {
            question: self.question,
            dimensions: self.dimensions.clone(),
            groups,
        }
    }

    /// Sums the metric over the groups sharing the key part at `index`.
    ///
    /// Useful for collapsing a two-dimensional result onto one dimension
    /// (e.g. the temporal trend onto years).
    #[must_use]
    pub fn rollup(&self, index: usize) -> BTreeMap<KeyPart, u64> {
        let mut totals = BTreeMap::new();
        for group in &self.groups {
            if let Some(part) = group.key.0.get(index) {
                *totals.entry(part.clone()).or_default() += group.metric.weight();
            }
        }
        totals
    }
}

/// Headline numbers of the filtered population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Filtered crashes.
    pub crashes: u64,
    /// Filtered person records.
    pub persons: u64,
    /// Persons injured across the filtered crashes.
    pub injured: u64,
    /// Persons killed across the filtered crashes.
    pub killed: u64,
}

/// Everything the dashboard renders for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResults {
    /// The resolved filter the results were computed for.
    pub filter: Filter,
    pub summary: Summary,
    /// One result per [`Question`], in [`Question::all`] order.
    pub results: Vec<AggregateResult>,
}

impl DashboardResults {
    #[must_use]
    pub fn result(&self, question: Question) -> Option<&AggregateResult> {
        self.results.iter().find(|r| r.question == question)
    }
}
