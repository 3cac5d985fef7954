//! Aggregation engine.
//!
//! Resolves a filter against the join view once, then makes a single pass
//! over each population (crashes, persons), feeding every record to every
//! spec drawing from that population.

use std::collections::BTreeMap;

use crash_dash_analytics_models::{
    AggregateResult, DashboardResults, GridResolution, Group, GroupKey, Metric, MetricKind,
    Summary,
};
use crash_dash_query_models::Filter;
use crash_dash_store::{DatasetStore, Selection};

use crate::questions::{self, AggregationSpec, CrashSpec, PersonSpec, SeedDomain};

/// Computes the summary block and all aggregate results for a filter.
pub struct AggregationEngine {
    crash_specs: Vec<Box<CrashSpec>>,
    person_specs: Vec<Box<PersonSpec>>,
}

impl AggregationEngine {
    /// An engine answering the ten standard questions.
    #[must_use]
    pub fn new(resolution: GridResolution) -> Self {
        Self::with_specs(questions::crash_specs(resolution), questions::person_specs())
    }

    #[must_use]
    pub fn with_specs(
        crash_specs: Vec<Box<CrashSpec>>,
        person_specs: Vec<Box<PersonSpec>>,
    ) -> Self {
        Self {
            crash_specs,
            person_specs,
        }
    }

    /// Computes every result for `filter`, ordered by question.
    ///
    /// An empty selection is not an error: seeded groups come back with
    /// zero counts or undefined rates.
    #[must_use]
    pub fn compute(&self, store: &DatasetStore, filter: &Filter) -> DashboardResults {
        let selection = store.view().select(filter);
        let domain = SeedDomain::for_filter(filter, store.year_span());

        let mut results = tally(&self.crash_specs, selection.crashes(), &domain);
        results.extend(tally(&self.person_specs, selection.persons(), &domain));
        results.sort_by_key(|r| r.question);

        log::debug!(
            "Aggregated {} crashes and {} persons for {filter}",
            selection.crash_count(),
            selection.person_count()
        );

        DashboardResults {
            filter: filter.clone(),
            summary: summarize(&selection),
            results,
        }
    }
}

impl std::fmt::Debug for AggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationEngine")
            .field("crash_specs", &self.crash_specs.len())
            .field("person_specs", &self.person_specs.len())
            .finish()
    }
}

/// Per-group record count and rate numerator.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    records: u64,
    hits: u64,
}

fn tally<R, S>(
    specs: &[Box<S>],
    records: impl Iterator<Item = R>,
    domain: &SeedDomain,
) -> Vec<AggregateResult>
where
    S: AggregationSpec<R> + ?Sized,
{
    let mut groups: Vec<BTreeMap<GroupKey, Tally>> = specs
        .iter()
        .map(|spec| {
            spec.seed_keys(domain)
                .into_iter()
                .map(|key| (key, Tally::default()))
                .collect()
        })
        .collect();

    for record in records {
        for (spec, groups) in specs.iter().zip(groups.iter_mut()) {
            let Some(key) = spec.group_key(&record) else {
                continue;
            };
            let tally = groups.entry(key).or_default();
            tally.records += 1;
            if spec.is_hit(&record) {
                tally.hits += 1;
            }
        }
    }

    specs
        .iter()
        .zip(groups)
        .map(|(spec, groups)| {
            let question = spec.question();
            let kind = question.metric_kind();
            AggregateResult {
                question,
                dimensions: question.dimensions().to_vec(),
                groups: groups
                    .into_iter()
                    .map(|(key, tally)| Group {
                        key,
                        metric: match kind {
                            MetricKind::Count => Metric::count(tally.records),
                            MetricKind::Rate => Metric::rate(tally.hits, tally.records),
                        },
                    })
                    .collect(),
            }
        })
        .collect()
}

fn summarize(selection: &Selection<'_>) -> Summary {
    let mut summary = Summary {
        crashes: selection.crash_count() as u64,
        persons: selection.person_count() as u64,
        ..Summary::default()
    };
    for crash in selection.crashes() {
        summary.injured += u64::from(crash.injured);
        summary.killed += u64::from(crash.killed);
    }
    summary
}

#[cfg(test)]
mod tests {
    use crash_dash_analytics_models::{KeyPart, Population, Question};
    use crash_dash_collision_models::{
        Borough, DayPeriod, PersonInjury, PersonRole, Season, VehicleCategory, VehicleCountBucket,
        YearRange,
    };
    use crash_dash_store::testing::sample_store;

    use super::*;

    fn engine() -> AggregationEngine {
        AggregationEngine::new(GridResolution::default())
    }

    fn key<const N: usize>(parts: [KeyPart; N]) -> GroupKey {
        GroupKey::from(parts)
    }

    fn sample_filters() -> Vec<Filter> {
        vec![
            Filter::unrestricted(),
            Filter::unrestricted().with_borough(Borough::Brooklyn),
            Filter::unrestricted().with_years(YearRange::new(2021, 2022)),
            Filter::unrestricted().with_vehicle_types([VehicleCategory::Taxi]),
            Filter::unrestricted().with_person_types([PersonRole::Pedestrian]),
            Filter::unrestricted()
                .with_borough(Borough::Queens)
                .with_person_types([PersonRole::Occupant]),
            Filter::unrestricted().with_borough(Borough::StatenIsland),
        ]
    }

    #[test]
    fn results_are_in_question_order() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        let questions: Vec<Question> = results.results.iter().map(|r| r.question).collect();
        assert_eq!(questions, Question::all());
    }

    #[test]
    fn groups_partition_their_population() {
        let store = sample_store();
        for filter in sample_filters() {
            let selection = store.view().select(&filter);
            let results = engine().compute(&store, &filter);

            for result in &results.results {
                let expected = match (result.question, result.question.population()) {
                    (Question::SpatialHotspots, _) => {
                        selection.crashes().filter(|c| c.location.is_some()).count()
                    }
                    (_, Population::Crashes) => selection.crash_count(),
                    (_, Population::Persons) => selection.person_count(),
                };
                assert_eq!(
                    result.population(),
                    expected as u64,
                    "{} under {filter}",
                    result.question
                );
            }
        }
    }

    #[test]
    fn group_keys_are_strictly_ascending() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        for result in &results.results {
            for pair in result.groups.windows(2) {
                assert!(pair[0].key < pair[1].key, "{} is not ordered", result.question);
            }
        }
    }

    #[test]
    fn unrestricted_totals_match_the_dataset() {
        let store = sample_store();
        let results = engine().compute(&store, &Filter::unrestricted());

        assert_eq!(
            results.summary,
            Summary {
                crashes: 7,
                persons: 13,
                injured: 7,
                killed: 1,
            }
        );
        assert_eq!(
            results.result(Question::TemporalTrend).unwrap().population(),
            store.crashes().len() as u64
        );
        assert_eq!(
            results.result(Question::VictimTypes).unwrap().population(),
            store.persons().len() as u64
        );
    }

    #[test]
    fn severity_by_borough_reports_empty_boroughs_as_undefined() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        let result = results.result(Question::SeverityByBorough).unwrap();

        assert_eq!(
            result.group(&key([KeyPart::Borough(Borough::Queens)])),
            Some(&Metric::rate(1, 2))
        );
        assert_eq!(
            result.group(&key([KeyPart::Borough(Borough::Brooklyn)])),
            Some(&Metric::rate(2, 2))
        );
        let staten = result
            .group(&key([KeyPart::Borough(Borough::StatenIsland)]))
            .unwrap();
        assert_eq!(staten.rate_value(), None);
        assert_eq!(staten.weight(), 0);

        let last = result.groups.last().unwrap();
        assert_eq!(last.key, key([KeyPart::Unknown]));
        assert_eq!(last.metric, Metric::rate(0, 1));
    }

    #[test]
    fn borough_filter_narrows_the_seeded_boroughs() {
        let results = engine().compute(
            &sample_store(),
            &Filter::unrestricted().with_borough(Borough::Queens),
        );
        let result = results.result(Question::SeverityByBorough).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].key, key([KeyPart::Borough(Borough::Queens)]));
    }

    #[test]
    fn closed_domains_are_always_present() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());

        let day_night = results.result(Question::DayNightSeverity).unwrap();
        assert_eq!(
            day_night.group(&key([KeyPart::DayPeriod(DayPeriod::Day)])),
            Some(&Metric::rate(2, 4))
        );
        assert_eq!(
            day_night.group(&key([KeyPart::DayPeriod(DayPeriod::Night)])),
            Some(&Metric::rate(3, 3))
        );

        let seasons = results.result(Question::SeasonalSeverity).unwrap();
        assert_eq!(seasons.groups.len(), 4);
        assert_eq!(
            seasons.group(&key([KeyPart::Season(Season::Winter)])),
            Some(&Metric::rate(2, 3))
        );
        assert_eq!(
            seasons.group(&key([KeyPart::Season(Season::Spring)])),
            Some(&Metric::rate(0, 1))
        );

        let vehicles = results.result(Question::MultiVehicleSeverity).unwrap();
        assert_eq!(
            vehicles.group(&key([KeyPart::VehicleCount(VehicleCountBucket::FourOrMore)])),
            Some(&Metric::rate(0, 0))
        );
        assert_eq!(
            vehicles.group(&key([KeyPart::VehicleCount(VehicleCountBucket::Three)])),
            Some(&Metric::rate(1, 1))
        );
    }

    #[test]
    fn temporal_trend_seeds_every_year_and_borough() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        let trend = results.result(Question::TemporalTrend).unwrap();

        // 2019-2023 across five boroughs, plus the unattributed 2021 crash.
        assert_eq!(trend.groups.len(), 26);
        assert_eq!(
            trend.group(&key([KeyPart::Year(2020), KeyPart::Borough(Borough::StatenIsland)])),
            Some(&Metric::count(0))
        );
        assert_eq!(
            trend.group(&key([KeyPart::Year(2021), KeyPart::Unknown])),
            Some(&Metric::count(1))
        );
        assert_eq!(trend.rollup(0)[&KeyPart::Year(2022)], 2);
    }

    #[test]
    fn factor_fatality_uses_the_primary_factor() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        let factors = results.result(Question::FactorFatality).unwrap();

        assert_eq!(
            factors.group(&key([KeyPart::Factor("Unsafe Speed".to_owned())])),
            Some(&Metric::rate(1, 2))
        );
        assert_eq!(
            factors.group(&key([KeyPart::Factor("Driver Inattention/Distraction".to_owned())])),
            Some(&Metric::rate(0, 2))
        );
        assert_eq!(factors.groups.last().unwrap().key, key([KeyPart::Unknown]));
        assert!(
            factors
                .group(&key([KeyPart::Factor("Following Too Closely".to_owned())]))
                .is_none()
        );
    }

    #[test]
    fn hotspots_share_cells_and_exclude_missing_coordinates() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        let hotspots = results.result(Question::SpatialHotspots).unwrap();

        assert_eq!(hotspots.population(), 6);
        assert_eq!(hotspots.groups.len(), 4);
        assert!(hotspots.groups.iter().any(|g| g.metric == Metric::count(2)));
    }

    #[test]
    fn person_questions_follow_the_person_filter() {
        let filter = Filter::unrestricted().with_person_types([PersonRole::Pedestrian]);
        let results = engine().compute(&sample_store(), &filter);

        assert_eq!(results.summary.crashes, 3);
        assert_eq!(results.summary.persons, 3);

        let victims = results.result(Question::VictimTypes).unwrap();
        assert_eq!(victims.population(), 3);
        assert_eq!(
            victims.group(&key([
                KeyPart::Role(PersonRole::Pedestrian),
                KeyPart::Injury(PersonInjury::Injured),
            ])),
            Some(&Metric::count(2))
        );

        let ages = results.result(Question::AgeVulnerability).unwrap();
        assert!(
            ages.groups
                .iter()
                .all(|g| g.key.parts()[1] == KeyPart::Role(PersonRole::Pedestrian))
        );
    }

    #[test]
    fn implausible_ages_are_unknown() {
        let results = engine().compute(&sample_store(), &Filter::unrestricted());
        let ages = results.result(Question::AgeVulnerability).unwrap();
        assert_eq!(
            ages.group(&key([KeyPart::Unknown, KeyPart::Role(PersonRole::Occupant)])),
            Some(&Metric::rate(1, 2))
        );
    }

    #[test]
    fn empty_selection_yields_empty_results() {
        let results = engine().compute(
            &sample_store(),
            &Filter::unrestricted()
                .with_borough(Borough::StatenIsland)
                .with_years(YearRange::single(2020)),
        );

        assert_eq!(results.summary, Summary::default());
        assert_eq!(results.results.len(), 10);
        for result in &results.results {
            assert_eq!(result.population(), 0);
            assert!(result.groups.iter().all(|g| g.metric.rate_value().is_none()));
        }
        assert_eq!(
            results.result(Question::TemporalTrend).unwrap().groups,
            vec![Group {
                key: key([KeyPart::Year(2020), KeyPart::Borough(Borough::StatenIsland)]),
                metric: Metric::count(0),
            }]
        );
    }

    #[test]
    fn remainder_does_not_change_results() {
        let store = sample_store();
        let plain = engine().compute(&store, &Filter::unrestricted());
        let noisy = engine().compute(
            &store,
            &Filter::unrestricted().with_remainder("purple unicorn"),
        );
        assert_eq!(plain.summary, noisy.summary);
        assert_eq!(plain.results, noisy.results);
    }
}
