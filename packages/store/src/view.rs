//! Filtered access to crashes and persons.
//!
//! The view never materializes the crash/person cross-join. Crash-level
//! restrictions are answered from the borough and year indices, the
//! person-type restriction is turned into a per-crash mask through the role
//! index, and persons are reached through the crash -> persons index.

use std::collections::BTreeSet;

use crash_dash_collision_models::{CrashRecord, PersonRecord, PersonRole};
use crash_dash_query_models::Filter;
use serde::Serialize;

use crate::DatasetStore;

/// A person together with the crash it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRow<'a> {
    pub person: &'a PersonRecord,
    pub crash: &'a CrashRecord,
}

/// Read-only join over a [`DatasetStore`].
#[derive(Debug, Clone, Copy)]
pub struct JoinView<'a> {
    store: &'a DatasetStore,
}

/// The crashes and persons one filter selects.
///
/// Crash positions are in load order; person positions are grouped by
/// crash, in crash order.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    store: &'a DatasetStore,
    crashes: Vec<usize>,
    persons: Vec<usize>,
}

impl<'a> JoinView<'a> {
    #[must_use]
    pub const fn new(store: &'a DatasetStore) -> Self {
        Self { store }
    }

    /// Crashes matching every crash-level restriction of `filter` and, when
    /// a person type is selected, involving at least one such person.
    #[must_use]
    pub fn filtered_crashes(&self, filter: &Filter) -> Vec<&'a CrashRecord> {
        self.select(filter).crashes().collect()
    }

    /// Persons belonging to a filtered crash and matching the person-type
    /// restriction, if any.
    #[must_use]
    pub fn filtered_persons(&self, filter: &Filter) -> Vec<PersonRow<'a>> {
        self.select(filter).persons().collect()
    }

    /// Resolves both populations for `filter` in one pass.
    #[must_use]
    pub fn select(&self, filter: &Filter) -> Selection<'a> {
        let store = self.store;
        let role_mask = filter
            .person_types
            .as_ref()
            .map(|roles| self.crashes_with_roles(roles));

        let crashes: Vec<usize> = self
            .candidates(filter)
            .into_iter()
            .filter(|&pos| {
                let crash = &store.crashes[pos];
                filter.borough.is_none_or(|b| crash.borough == Some(b))
                    && filter.years.is_none_or(|y| y.contains(crash.year()))
                    && filter
                        .vehicle_types
                        .as_ref()
                        .is_none_or(|types| crash.involves_any(types))
                    && role_mask.as_ref().is_none_or(|mask| mask[pos])
            })
            .collect();

        let persons: Vec<usize> = crashes
            .iter()
            .flat_map(|&pos| store.persons_by_crash[pos].iter().copied())
            .filter(|&p| {
                filter
                    .person_types
                    .as_ref()
                    .is_none_or(|roles| roles.contains(&store.persons[p].role))
            })
            .collect();

        log::trace!(
            "Selected {} crashes and {} persons for {filter}",
            crashes.len(),
            persons.len()
        );

        Selection {
            store,
            crashes,
            persons,
        }
    }

    /// Narrowest index bucket for the filter's crash-level restrictions, in
    /// load order.
    fn candidates(&self, filter: &Filter) -> Vec<usize> {
        let store = self.store;

        if let Some(borough) = filter.borough {
            return store
                .by_borough
                .get(&Some(borough))
                .cloned()
                .unwrap_or_default();
        }

        if let Some(years) = filter.years {
            let mut positions: Vec<usize> = store
                .by_year
                .range(years.start..=years.end)
                .flat_map(|(_, positions)| positions.iter().copied())
                .collect();
            positions.sort_unstable();
            return positions;
        }

        (0..store.crashes.len()).collect()
    }

    /// Per-crash flags: does the crash involve any person in `roles`.
    fn crashes_with_roles(&self, roles: &BTreeSet<PersonRole>) -> Vec<bool> {
        let store = self.store;
        let mut mask = vec![false; store.crashes.len()];
        for role in roles {
            for &p in store.persons_by_role.get(role).into_iter().flatten() {
                mask[store.crash_of_person[p]] = true;
            }
        }
        mask
    }
}

impl<'a> Selection<'a> {
    pub fn crashes(&self) -> impl ExactSizeIterator<Item = &'a CrashRecord> + '_ {
        self.crashes.iter().map(|&pos| &self.store.crashes[pos])
    }

    pub fn persons(&self) -> impl ExactSizeIterator<Item = PersonRow<'a>> + '_ {
        self.persons.iter().map(|&p| PersonRow {
            person: &self.store.persons[p],
            crash: &self.store.crashes[self.store.crash_of_person[p]],
        })
    }

    #[must_use]
    pub fn crash_count(&self) -> usize {
        self.crashes.len()
    }

    #[must_use]
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crash_dash_collision_models::{Borough, CrashId, VehicleCategory, YearRange};

    use super::*;
    use crate::testing::sample_store;

    fn ids(crashes: &[&CrashRecord]) -> Vec<CrashId> {
        crashes.iter().map(|c| c.id).collect()
    }

    fn sample_filters() -> Vec<Filter> {
        vec![
            Filter::unrestricted(),
            Filter::unrestricted().with_borough(Borough::Brooklyn),
            Filter::unrestricted().with_years(YearRange::new(2020, 2021)),
            Filter::unrestricted().with_vehicle_types([VehicleCategory::Bicycle]),
            Filter::unrestricted().with_person_types([PersonRole::Pedestrian]),
            Filter::unrestricted()
                .with_borough(Borough::Queens)
                .with_years(YearRange::single(2022))
                .with_person_types([PersonRole::Cyclist, PersonRole::Occupant]),
            Filter::unrestricted().with_borough(Borough::StatenIsland),
        ]
    }

    #[test]
    fn persons_only_come_from_filtered_crashes() {
        let store = sample_store();
        let view = store.view();

        for filter in sample_filters() {
            let crash_ids: BTreeSet<CrashId> =
                view.filtered_crashes(&filter).iter().map(|c| c.id).collect();
            for row in view.filtered_persons(&filter) {
                assert!(
                    crash_ids.contains(&row.person.crash_id),
                    "person of crash {} leaked through {filter}",
                    row.person.crash_id
                );
                assert_eq!(row.crash.id, row.person.crash_id);
            }
        }
    }

    #[test]
    fn unrestricted_selects_everything_in_load_order() {
        let store = sample_store();
        let view = store.view();
        let crashes = view.filtered_crashes(&Filter::unrestricted());

        assert_eq!(crashes.len(), store.crashes().len());
        assert_eq!(
            ids(&crashes),
            store.crashes().iter().map(|c| c.id).collect::<Vec<_>>()
        );
        assert_eq!(
            view.filtered_persons(&Filter::unrestricted()).len(),
            store.persons().len()
        );
    }

    #[test]
    fn crash_level_restrictions() {
        let store = sample_store();
        let view = store.view();

        let brooklyn =
            view.filtered_crashes(&Filter::unrestricted().with_borough(Borough::Brooklyn));
        assert!(!brooklyn.is_empty());
        assert!(brooklyn.iter().all(|c| c.borough == Some(Borough::Brooklyn)));

        let years = YearRange::new(2020, 2021);
        let in_years = view.filtered_crashes(&Filter::unrestricted().with_years(years));
        assert!(!in_years.is_empty());
        assert!(in_years.iter().all(|c| years.contains(c.year())));
        let mut sorted = ids(&in_years);
        sorted.sort_unstable();
        assert_eq!(ids(&in_years), sorted);

        let bikes = view.filtered_crashes(
            &Filter::unrestricted().with_vehicle_types([VehicleCategory::Bicycle]),
        );
        assert!(!bikes.is_empty());
        assert!(
            bikes
                .iter()
                .all(|c| c.vehicle_types.contains(&VehicleCategory::Bicycle))
        );
    }

    #[test]
    fn person_type_restricts_crashes_and_persons() {
        let store = sample_store();
        let view = store.view();
        let filter = Filter::unrestricted().with_person_types([PersonRole::Pedestrian]);

        let crashes = view.filtered_crashes(&filter);
        assert!(!crashes.is_empty());
        for crash in &crashes {
            assert!(
                store
                    .persons_of(crash.id)
                    .any(|p| p.role == PersonRole::Pedestrian)
            );
        }

        let persons = view.filtered_persons(&filter);
        assert!(!persons.is_empty());
        assert!(persons.iter().all(|r| r.person.role == PersonRole::Pedestrian));
    }

    #[test]
    fn borough_without_crashes_selects_nothing() {
        let store = sample_store();
        let selection = store
            .view()
            .select(&Filter::unrestricted().with_borough(Borough::StatenIsland));
        assert_eq!(selection.crash_count(), 0);
        assert_eq!(selection.person_count(), 0);
    }
}
