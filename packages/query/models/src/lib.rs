#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter and request types for collision queries.
//!
//! A [`FilterRequest`] is what the UI sends: raw dropdown strings plus an
//! optional search phrase. A [`Filter`] is the canonical, typed predicate
//! the request resolves to. Filters are plain values; equality and
//! ordering over every field make them usable as cache keys.

use std::collections::BTreeSet;

use crash_dash_collision_models::{Borough, PersonRole, VehicleCategory, YearRange};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Dropdown value meaning "no restriction".
pub const ALL_SELECTION: &str = "ALL";

/// Raw request from the dashboard UI.
///
/// Each selection is either unset (`None`, blank, or [`ALL_SELECTION`]) or
/// one value from the corresponding enumeration, as the UI labels it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    /// Borough dropdown value.
    pub borough: Option<String>,
    /// Year dropdown value: `"2021"` or an inclusive range `"2019-2021"`.
    pub year: Option<String>,
    /// Vehicle type dropdown value.
    pub vehicle_type: Option<String>,
    /// Person type dropdown value.
    pub person_type: Option<String>,
    /// Free-text search phrase.
    pub text: Option<String>,
}

impl FilterRequest {
    /// A request with every selection reset to "All" and no search text.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Returns `value` unless it is blank or the "All" sentinel.
    #[must_use]
    pub fn selected(value: Option<&str>) -> Option<&str> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL_SELECTION))
    }
}

/// The structured selection a value was provided for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionField {
    Borough,
    Year,
    VehicleType,
    PersonType,
}

/// Canonical, immutable query predicate.
///
/// `None` in any field means "no restriction on this dimension". Set-valued
/// fields are never `Some` of an empty set.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub borough: Option<Borough>,
    pub years: Option<YearRange>,
    pub vehicle_types: Option<BTreeSet<VehicleCategory>>,
    pub person_types: Option<BTreeSet<PersonRole>>,
    /// Words of the search phrase that matched no vocabulary entry. Never
    /// restricts data.
    pub remainder: Option<String>,
}

impl Filter {
    /// A filter restricting nothing.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_borough(mut self, borough: Borough) -> Self {
        self.borough = Some(borough);
        self
    }

    #[must_use]
    pub fn with_years(mut self, years: YearRange) -> Self {
        self.years = Some(years);
        self
    }

    #[must_use]
    pub fn with_vehicle_types(mut self, types: impl IntoIterator<Item = VehicleCategory>) -> Self {
        self.vehicle_types = non_empty(types.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_person_types(mut self, types: impl IntoIterator<Item = PersonRole>) -> Self {
        self.person_types = non_empty(types.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_remainder(mut self, remainder: impl Into<String>) -> Self {
        let remainder = remainder.into();
        self.remainder = (!remainder.trim().is_empty()).then_some(remainder);
        self
    }

    /// The same restrictions with the remainder dropped. Filters that select
    /// the same data compare equal after this.
    #[must_use]
    pub fn without_remainder(mut self) -> Self {
        self.remainder = None;
        self
    }

    /// Whether no data dimension is restricted. The remainder is ignored.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        self.borough.is_none()
            && self.years.is_none()
            && self.vehicle_types.is_none()
            && self.person_types.is_none()
    }

    /// Whether any crash-level dimension (borough, year, vehicle) is set.
    #[must_use]
    pub const fn restricts_crashes(&self) -> bool {
        self.borough.is_some() || self.years.is_some() || self.vehicle_types.is_some()
    }

    /// Combines dropdown and text-derived filters.
    ///
    /// Each dimension takes the dropdown value when one was selected and
    /// falls back to the text-derived value otherwise. The remainder always
    /// comes from the text.
    #[must_use]
    pub fn merge(dropdown: Self, text: Self) -> Self {
        Self {
            borough: dropdown.borough.or(text.borough),
            years: dropdown.years.or(text.years),
            vehicle_types: dropdown
                .vehicle_types
                .and_then(non_empty)
                .or_else(|| text.vehicle_types.and_then(non_empty)),
            person_types: dropdown
                .person_types
                .and_then(non_empty)
                .or_else(|| text.person_types.and_then(non_empty)),
            remainder: text.remainder,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(borough) = self.borough {
            parts.push(format!("borough={borough}"));
        }
        if let Some(years) = self.years {
            parts.push(format!("years={years}"));
        }
        if let Some(types) = &self.vehicle_types {
            let names: Vec<String> = types.iter().map(ToString::to_string).collect();
            parts.push(format!("vehicles={}", names.join("|")));
        }
        if let Some(types) = &self.person_types {
            let names: Vec<String> = types.iter().map(ToString::to_string).collect();
            parts.push(format!("persons={}", names.join("|")));
        }
        if parts.is_empty() {
            write!(f, "all records")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

fn non_empty<T: Ord>(set: BTreeSet<T>) -> Option<BTreeSet<T>> {
    (!set.is_empty()).then_some(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_treats_all_and_blank_as_unset() {
        assert_eq!(FilterRequest::selected(None), None);
        assert_eq!(FilterRequest::selected(Some("  ")), None);
        assert_eq!(FilterRequest::selected(Some("all")), None);
        assert_eq!(FilterRequest::selected(Some("ALL")), None);
        assert_eq!(FilterRequest::selected(Some(" Queens ")), Some("Queens"));
    }

    #[test]
    fn dropdown_wins_per_dimension() {
        let dropdown = Filter::unrestricted().with_borough(Borough::Queens);
        let text = Filter::unrestricted()
            .with_borough(Borough::Brooklyn)
            .with_years(YearRange::single(2022))
            .with_remainder("crashes");

        let merged = Filter::merge(dropdown, text);
        assert_eq!(merged.borough, Some(Borough::Queens));
        assert_eq!(merged.years, Some(YearRange::single(2022)));
        assert_eq!(merged.remainder.as_deref(), Some("crashes"));
    }

    #[test]
    fn empty_sets_never_restrict() {
        let filter = Filter::unrestricted().with_vehicle_types([]);
        assert_eq!(filter.vehicle_types, None);

        let dropdown = Filter {
            person_types: Some(BTreeSet::new()),
            ..Filter::default()
        };
        let text = Filter::unrestricted().with_person_types([PersonRole::Cyclist]);
        assert_eq!(
            Filter::merge(dropdown, text).person_types,
            Some(BTreeSet::from([PersonRole::Cyclist]))
        );
    }

    #[test]
    fn remainder_does_not_restrict() {
        let filter = Filter::unrestricted().with_remainder("purple unicorn");
        assert!(filter.is_unrestricted());
        assert_ne!(filter, Filter::unrestricted());
        assert_eq!(Filter::unrestricted().with_remainder("   ").remainder, None);
    }

    #[test]
    fn without_remainder_keeps_restrictions() {
        let purple = Filter::unrestricted()
            .with_borough(Borough::Bronx)
            .with_remainder("purple unicorn");
        let blue = Filter::unrestricted()
            .with_borough(Borough::Bronx)
            .with_remainder("blue unicorn");

        assert_ne!(purple, blue);
        assert_eq!(purple.clone().without_remainder(), blue.without_remainder());
        assert_eq!(
            purple.without_remainder(),
            Filter::unrestricted().with_borough(Borough::Bronx)
        );
    }

    #[test]
    fn equal_filters_are_equal_keys() {
        let a = Filter::unrestricted()
            .with_vehicle_types([VehicleCategory::Taxi, VehicleCategory::Bus]);
        let b = Filter::unrestricted()
            .with_vehicle_types([VehicleCategory::Bus, VehicleCategory::Taxi]);
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
    }

    #[test]
    fn display_summarizes_restrictions() {
        assert_eq!(Filter::unrestricted().to_string(), "all records");
        let filter = Filter::unrestricted()
            .with_borough(Borough::StatenIsland)
            .with_years(YearRange::new(2019, 2021));
        assert_eq!(filter.to_string(), "borough=STATEN ISLAND, years=2019-2021");
    }

    #[test]
    fn request_deserializes_camel_case() {
        let request: FilterRequest = serde_json::from_str(
            r#"{"borough":"QUEENS","vehicleType":"Sedan","text":"night crashes"}"#,
        )
        .unwrap();
        assert_eq!(request.borough.as_deref(), Some("QUEENS"));
        assert_eq!(request.vehicle_type.as_deref(), Some("Sedan"));
        assert_eq!(request.year, None);
    }
}
