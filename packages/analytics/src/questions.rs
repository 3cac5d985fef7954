//! The ten research questions as [`AggregationSpec`] implementations.
//!
//! A spec only describes how one record maps to a group and whether it
//! counts towards the group's rate. The engine drives the traversal.

use crash_dash_analytics_models::{GridResolution, GroupKey, KeyPart, Question};
use crash_dash_collision_models::{
    AgeBucket, Borough, CrashRecord, DayPeriod, PersonRole, Season, VehicleCountBucket, YearRange,
};
use crash_dash_query_models::Filter;
use crash_dash_store::PersonRow;

/// Closed value domains used to seed groups that have no records, so they
/// are reported with a zero count or an undefined rate instead of being
/// omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedDomain {
    pub years: Vec<i32>,
    pub boroughs: Vec<Borough>,
    pub roles: Vec<PersonRole>,
}

impl SeedDomain {
    /// The domain a filter leaves open. Unrestricted years fall back to the
    /// span of years present in the data.
    #[must_use]
    pub fn for_filter(filter: &Filter, data_years: Option<YearRange>) -> Self {
        Self {
            years: filter
                .years
                .or(data_years)
                .map(|range| range.years().collect())
                .unwrap_or_default(),
            boroughs: filter
                .borough
                .map_or_else(|| Borough::all().to_vec(), |b| vec![b]),
            roles: filter
                .person_types
                .as_ref()
                .map_or_else(|| PersonRole::all().to_vec(), |r| r.iter().copied().collect()),
        }
    }
}

/// One aggregation over records of type `R`.
pub trait AggregationSpec<R>: Send + Sync {
    fn question(&self) -> Question;

    /// The record's group, or `None` to leave it out of this aggregation
    /// entirely.
    fn group_key(&self, record: &R) -> Option<GroupKey>;

    /// Whether the record counts towards its group's rate numerator.
    fn is_hit(&self, _record: &R) -> bool {
        false
    }

    /// Groups reported even when no record falls into them.
    fn seed_keys(&self, _domain: &SeedDomain) -> Vec<GroupKey> {
        Vec::new()
    }
}

/// An aggregation over crashes.
pub type CrashSpec = dyn for<'a> AggregationSpec<&'a CrashRecord>;

/// An aggregation over persons joined with their crash.
pub type PersonSpec = dyn for<'a> AggregationSpec<PersonRow<'a>>;

fn borough_part(borough: Option<Borough>) -> KeyPart {
    KeyPart::or_unknown(borough, KeyPart::Borough)
}

fn seeds<T: Copy>(values: &[T], part: impl Fn(T) -> KeyPart) -> Vec<GroupKey> {
    values.iter().map(|&v| GroupKey::from([part(v)])).collect()
}

pub struct TemporalTrend;

impl<'a> AggregationSpec<&'a CrashRecord> for TemporalTrend {
    fn question(&self) -> Question {
        Question::TemporalTrend
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        Some(GroupKey::from([
            KeyPart::Year(crash.year()),
            borough_part(crash.borough),
        ]))
    }

    fn seed_keys(&self, domain: &SeedDomain) -> Vec<GroupKey> {
        domain
            .years
            .iter()
            .flat_map(|&year| {
                domain
                    .boroughs
                    .iter()
                    .map(move |&b| GroupKey::from([KeyPart::Year(year), KeyPart::Borough(b)]))
            })
            .collect()
    }
}

pub struct SeverityByBorough;

impl<'a> AggregationSpec<&'a CrashRecord> for SeverityByBorough {
    fn question(&self) -> Question {
        Question::SeverityByBorough
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        Some(GroupKey::from([borough_part(crash.borough)]))
    }

    fn is_hit(&self, crash: &&'a CrashRecord) -> bool {
        crash.is_severe()
    }

    fn seed_keys(&self, domain: &SeedDomain) -> Vec<GroupKey> {
        seeds(&domain.boroughs, KeyPart::Borough)
    }
}

pub struct VictimTypes;

impl<'a> AggregationSpec<PersonRow<'a>> for VictimTypes {
    fn question(&self) -> Question {
        Question::VictimTypes
    }

    fn group_key(&self, row: &PersonRow<'a>) -> Option<GroupKey> {
        Some(GroupKey::from([
            KeyPart::Role(row.person.role),
            KeyPart::Injury(row.person.injury),
        ]))
    }
}

pub struct FactorFatality;

impl<'a> AggregationSpec<&'a CrashRecord> for FactorFatality {
    fn question(&self) -> Question {
        Question::FactorFatality
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        Some(GroupKey::from([KeyPart::or_unknown(
            crash.primary_factor(),
            |f| KeyPart::Factor(f.to_owned()),
        )]))
    }

    fn is_hit(&self, crash: &&'a CrashRecord) -> bool {
        crash.is_fatal()
    }
}

pub struct VehicleSeverity;

impl<'a> AggregationSpec<&'a CrashRecord> for VehicleSeverity {
    fn question(&self) -> Question {
        Question::VehicleSeverity
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        Some(GroupKey::from([
            KeyPart::or_unknown(crash.primary_vehicle(), KeyPart::Vehicle),
            KeyPart::Severity(crash.severity()),
        ]))
    }
}

/// Crashes without coordinates are excluded from this aggregation only.
pub struct SpatialHotspots {
    resolution: GridResolution,
}

impl SpatialHotspots {
    #[must_use]
    pub const fn new(resolution: GridResolution) -> Self {
        Self { resolution }
    }
}

impl<'a> AggregationSpec<&'a CrashRecord> for SpatialHotspots {
    fn question(&self) -> Question {
        Question::SpatialHotspots
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        let location = crash.location.as_ref()?;
        Some(GroupKey::from([KeyPart::Cell(self.resolution.cell(location))]))
    }
}

pub struct DayNightSeverity;

impl<'a> AggregationSpec<&'a CrashRecord> for DayNightSeverity {
    fn question(&self) -> Question {
        Question::DayNightSeverity
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        crash
            .day_period()
            .map(|period| GroupKey::from([KeyPart::DayPeriod(period)]))
    }

    fn is_hit(&self, crash: &&'a CrashRecord) -> bool {
        crash.is_severe()
    }

    fn seed_keys(&self, _domain: &SeedDomain) -> Vec<GroupKey> {
        seeds(DayPeriod::all(), KeyPart::DayPeriod)
    }
}

pub struct AgeVulnerability;

impl<'a> AggregationSpec<PersonRow<'a>> for AgeVulnerability {
    fn question(&self) -> Question {
        Question::AgeVulnerability
    }

    fn group_key(&self, row: &PersonRow<'a>) -> Option<GroupKey> {
        Some(GroupKey::from([
            KeyPart::or_unknown(row.person.age_bucket(), KeyPart::AgeBucket),
            KeyPart::Role(row.person.role),
        ]))
    }

    fn is_hit(&self, row: &PersonRow<'a>) -> bool {
        row.person.is_harmed()
    }

    fn seed_keys(&self, domain: &SeedDomain) -> Vec<GroupKey> {
        AgeBucket::all()
            .iter()
            .flat_map(|&bucket| {
                domain
                    .roles
                    .iter()
                    .map(move |&role| {
                        GroupKey::from([KeyPart::AgeBucket(bucket), KeyPart::Role(role)])
                    })
            })
            .collect()
    }
}

pub struct MultiVehicleSeverity;

impl<'a> AggregationSpec<&'a CrashRecord> for MultiVehicleSeverity {
    fn question(&self) -> Question {
        Question::MultiVehicleSeverity
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        Some(GroupKey::from([KeyPart::or_unknown(
            crash.vehicle_count_bucket(),
            KeyPart::VehicleCount,
        )]))
    }

    fn is_hit(&self, crash: &&'a CrashRecord) -> bool {
        crash.is_severe()
    }

    fn seed_keys(&self, _domain: &SeedDomain) -> Vec<GroupKey> {
        seeds(VehicleCountBucket::all(), KeyPart::VehicleCount)
    }
}

pub struct SeasonalSeverity;

impl<'a> AggregationSpec<&'a CrashRecord> for SeasonalSeverity {
    fn question(&self) -> Question {
        Question::SeasonalSeverity
    }

    fn group_key(&self, crash: &&'a CrashRecord) -> Option<GroupKey> {
        Some(GroupKey::from([KeyPart::Season(crash.season())]))
    }

    fn is_hit(&self, crash: &&'a CrashRecord) -> bool {
        crash.is_severe()
    }

    fn seed_keys(&self, _domain: &SeedDomain) -> Vec<GroupKey> {
        seeds(Season::all(), KeyPart::Season)
    }
}

/// The eight crash-level questions.
#[must_use]
pub fn crash_specs(resolution: GridResolution) -> Vec<Box<CrashSpec>> {
    vec![
        Box::new(TemporalTrend),
        Box::new(SeverityByBorough),
        Box::new(FactorFatality),
        Box::new(VehicleSeverity),
        Box::new(SpatialHotspots::new(resolution)),
        Box::new(DayNightSeverity),
        Box::new(MultiVehicleSeverity),
        Box::new(SeasonalSeverity),
    ]
}

/// The two person-level questions.
#[must_use]
pub fn person_specs() -> Vec<Box<PersonSpec>> {
    vec![Box::new(VictimTypes), Box::new(AgeVulnerability)]
}
