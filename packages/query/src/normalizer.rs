//! Dropdown selection normalization.

use std::str::FromStr as _;

use crash_dash_collision_models::{Borough, PersonRole, VehicleCategory, YearRange, vehicle};
use crash_dash_query_models::{Filter, FilterRequest, SelectionField};

use crate::QueryError;

/// Turns the four structured dropdown selections into a [`Filter`].
#[derive(Debug, Clone, Copy)]
pub struct FilterNormalizer {
    /// Years the dataset covers. Year selections outside it are invalid.
    window: YearRange,
}

impl FilterNormalizer {
    #[must_use]
    pub const fn new(window: YearRange) -> Self {
        Self { window }
    }

    /// Builds a filter from the request's dropdown selections. The free
    /// text is ignored here.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidSelection`] naming the first selection
    /// whose value is outside its enumeration.
    pub fn normalize(&self, request: &FilterRequest) -> Result<Filter, QueryError> {
        let mut filter = Filter::unrestricted();

        if let Some(raw) = FilterRequest::selected(request.borough.as_deref()) {
            let borough = Borough::from_str(raw)
                .map_err(|_| QueryError::invalid(SelectionField::Borough, raw))?;
            filter = filter.with_borough(borough);
        }

        if let Some(raw) = FilterRequest::selected(request.year.as_deref()) {
            filter = filter.with_years(self.parse_years(raw)?);
        }

        if let Some(raw) = FilterRequest::selected(request.vehicle_type.as_deref()) {
            filter = filter.with_vehicle_types([parse_vehicle(raw)?]);
        }

        if let Some(raw) = FilterRequest::selected(request.person_type.as_deref()) {
            let role = PersonRole::from_str(raw)
                .map_err(|_| QueryError::invalid(SelectionField::PersonType, raw))?;
            filter = filter.with_person_types([role]);
        }

        Ok(filter)
    }

    /// Parses `"2021"` or `"2019-2021"`, requiring the range to lie inside
    /// the dataset window.
    fn parse_years(&self, raw: &str) -> Result<YearRange, QueryError> {
        let invalid = || QueryError::invalid(SelectionField::Year, raw);

        let range = match raw.split_once('-') {
            Some((start, end)) => {
                let start: i32 = start.trim().parse().map_err(|_| invalid())?;
                let end: i32 = end.trim().parse().map_err(|_| invalid())?;
                YearRange::new(start, end)
            }
            None => YearRange::single(raw.parse().map_err(|_| invalid())?),
        };

        if self.window.covers(&range) {
            Ok(range)
        } else {
            Err(invalid())
        }
    }
}

/// Accepts a category label ("Passenger Vehicle") or a dataset label that is
/// exactly one of the category keywords ("Sedan", "Pick-up Truck").
fn parse_vehicle(raw: &str) -> Result<VehicleCategory, QueryError> {
    VehicleCategory::from_str(raw)
        .ok()
        .or_else(|| vehicle::from_label(raw))
        .ok_or_else(|| QueryError::invalid(SelectionField::VehicleType, raw))
}
