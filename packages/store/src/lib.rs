#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory collision datasets.
//!
//! A [`DatasetStore`] owns the crash-level and person-level records for the
//! lifetime of the process. It is built once (from already-cleaned records
//! or via [`loader`]), validates crash-identifier referential integrity,
//! builds the indices the [`view::JoinView`] filters with, and is read-only
//! afterwards. Share it behind an `Arc`.

pub mod loader;
pub mod view;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::collections::{BTreeMap, BTreeSet, btree_map::Entry};

use crash_dash_collision_models::{
    Borough, CrashId, CrashRecord, PersonRecord, PersonRole, VehicleCategory, YearRange,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use view::{JoinView, PersonRow, Selection};

/// Errors that can occur while building or loading a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading a dataset file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dataset file is not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required field could not be parsed.
    #[error("Malformed {column} in row {row}: '{value}'")]
    Malformed {
        /// 1-based data row number.
        row: u64,
        /// Column name.
        column: &'static str,
        /// The raw value.
        value: String,
    },

    /// Two crash rows share an identifier.
    #[error("Duplicate crash identifier {0}")]
    DuplicateCrash(CrashId),
}

/// Distinct values present in the loaded data, for populating dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOptions {
    pub boroughs: Vec<Borough>,
    pub years: Vec<i32>,
    pub vehicle_types: Vec<VehicleCategory>,
    pub person_types: Vec<PersonRole>,
}

/// The two immutable datasets plus their indices.
#[derive(Debug)]
pub struct DatasetStore {
    crashes: Vec<CrashRecord>,
    persons: Vec<PersonRecord>,
    /// Crash identifier -> position in `crashes`.
    crash_index: BTreeMap<CrashId, usize>,
    /// Borough (or `None` for unattributed crashes) -> crash positions.
    by_borough: BTreeMap<Option<Borough>, Vec<usize>>,
    /// Year -> crash positions.
    by_year: BTreeMap<i32, Vec<usize>>,
    /// Crash position -> positions of its persons.
    persons_by_crash: Vec<Vec<usize>>,
    /// Person position -> position of its crash.
    crash_of_person: Vec<usize>,
    /// Role -> person positions.
    persons_by_role: BTreeMap<PersonRole, Vec<usize>>,
    orphans_dropped: usize,
}

impl DatasetStore {
    /// Builds the store and its indices.
    ///
    /// Persons whose crash identifier matches no crash are logged and
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCrash`] if two crashes share an
    /// identifier.
    pub fn new(
        crashes: Vec<CrashRecord>,
        persons: Vec<PersonRecord>,
    ) -> Result<Self, StoreError> {
        let mut crash_index = BTreeMap::new();
        let mut by_borough: BTreeMap<Option<Borough>, Vec<usize>> = BTreeMap::new();
        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();

        for (pos, crash) in crashes.iter().enumerate() {
            match crash_index.entry(crash.id) {
                Entry::Occupied(_) => return Err(StoreError::DuplicateCrash(crash.id)),
                Entry::Vacant(slot) => {
                    slot.insert(pos);
                }
            }
            by_borough.entry(crash.borough).or_default().push(pos);
            by_year.entry(crash.year()).or_default().push(pos);
        }

        let mut kept = Vec::with_capacity(persons.len());
        let mut persons_by_crash = vec![Vec::new(); crashes.len()];
        let mut crash_of_person = Vec::with_capacity(persons.len());
        let mut persons_by_role: BTreeMap<PersonRole, Vec<usize>> = BTreeMap::new();
        let mut orphans_dropped = 0;

        for person in persons {
            let Some(&crash_pos) = crash_index.get(&person.crash_id) else {
                orphans_dropped += 1;
                log::debug!(
                    "Dropping person record for unknown crash {}",
                    person.crash_id
                );
                continue;
            };
            let pos = kept.len();
            persons_by_crash[crash_pos].push(pos);
            crash_of_person.push(crash_pos);
            persons_by_role.entry(person.role).or_default().push(pos);
            kept.push(person);
        }

        if orphans_dropped > 0 {
            log::warn!(
                "Data integrity: dropped {orphans_dropped} person record(s) referencing unknown crash identifiers"
            );
        }

        log::info!(
            "Indexed {} crashes and {} person records",
            crashes.len(),
            kept.len()
        );

        Ok(Self {
            crashes,
            persons: kept,
            crash_index,
            by_borough,
            by_year,
            persons_by_crash,
            crash_of_person,
            persons_by_role,
            orphans_dropped,
        })
    }

    /// All crash records, in load order.
    #[must_use]
    pub fn crashes(&self) -> &[CrashRecord] {
        &self.crashes
    }

    /// All retained person records, in load order.
    #[must_use]
    pub fn persons(&self) -> &[PersonRecord] {
        &self.persons
    }

    #[must_use]
    pub fn crash(&self, id: CrashId) -> Option<&CrashRecord> {
        self.crash_index.get(&id).map(|&pos| &self.crashes[pos])
    }

    /// Person records of one crash.
    pub fn persons_of(&self, id: CrashId) -> impl Iterator<Item = &PersonRecord> {
        self.crash_index
            .get(&id)
            .into_iter()
            .flat_map(|&pos| self.persons_by_crash[pos].iter())
            .map(|&p| &self.persons[p])
    }

    /// Number of person records dropped at load for referencing an unknown
    /// crash.
    #[must_use]
    pub const fn orphans_dropped(&self) -> usize {
        self.orphans_dropped
    }

    /// The earliest and latest crash years present, if any.
    #[must_use]
    pub fn year_span(&self) -> Option<YearRange> {
        let first = *self.by_year.keys().next()?;
        let last = *self.by_year.keys().next_back()?;
        Some(YearRange::new(first, last))
    }

    /// Distinct dropdown values present in the data, sorted.
    #[must_use]
    pub fn options(&self) -> DatasetOptions {
        let vehicle_types: BTreeSet<VehicleCategory> = self
            .crashes
            .iter()
            .flat_map(|c| c.vehicle_types.iter().copied())
            .collect();

        DatasetOptions {
            boroughs: self.by_borough.keys().filter_map(|b| *b).collect(),
            years: self.by_year.keys().copied().collect(),
            vehicle_types: vehicle_types.into_iter().collect(),
            person_types: self.persons_by_role.keys().copied().collect(),
        }
    }

    /// A join view over both datasets.
    #[must_use]
    pub const fn view(&self) -> JoinView<'_> {
        JoinView::new(self)
    }
}
