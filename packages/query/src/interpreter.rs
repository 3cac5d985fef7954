//! Free-text query interpretation.
//!
//! A lexical matcher over a closed vocabulary: the query is tokenized once
//! and scanned left to right. At each position the longest phrase (up to
//! [`MAX_PHRASE_TOKENS`] words) known to any dimension is consumed; tokens
//! nothing recognizes become the filter's remainder. Word order, negation
//! and sentence structure are deliberately not interpreted.

use std::collections::BTreeSet;

use crash_dash_collision_models::{Borough, PersonRole, VehicleCategory, YearRange};
use crash_dash_query_models::Filter;

use crate::vocabulary::{Lexicon, MAX_PHRASE_TOKENS, tokenize};

/// Extracts a partial [`Filter`] from a search phrase.
#[derive(Debug, Clone)]
pub struct TextInterpreter {
    lexicon: Lexicon,
    /// Four-digit tokens inside this window are read as years.
    window: YearRange,
}

/// Entities collected during one scan.
#[derive(Default)]
struct Mentions {
    borough: Option<Borough>,
    years: Option<YearRange>,
    vehicles: BTreeSet<VehicleCategory>,
    roles: BTreeSet<PersonRole>,
    unmatched: Vec<String>,
}

impl TextInterpreter {
    #[must_use]
    pub const fn new(lexicon: Lexicon, window: YearRange) -> Self {
        Self { lexicon, window }
    }

    /// Interprets `text`.
    ///
    /// The first borough mentioned wins, vehicle and role mentions
    /// accumulate, and several years span the range from the earliest to
    /// the latest. Text matching nothing yields an unrestricted filter
    /// (with the text as its remainder).
    #[must_use]
    pub fn interpret(&self, text: &str) -> Filter {
        let tokens = tokenize(text);
        let mut mentions = Mentions::default();

        let mut pos = 0;
        while pos < tokens.len() {
            let longest = MAX_PHRASE_TOKENS.min(tokens.len() - pos);
            let consumed = (1..=longest)
                .rev()
                .find(|&len| self.record(&tokens[pos..pos + len].join(" "), &mut mentions));

            if let Some(len) = consumed {
                pos += len;
            } else {
                mentions.unmatched.push(tokens[pos].clone());
                pos += 1;
            }
        }

        let mut filter = Filter::unrestricted()
            .with_vehicle_types(mentions.vehicles)
            .with_person_types(mentions.roles)
            .with_remainder(mentions.unmatched.join(" "));
        if let Some(borough) = mentions.borough {
            filter = filter.with_borough(borough);
        }
        if let Some(years) = mentions.years {
            filter = filter.with_years(years);
        }

        log::debug!("Interpreted {text:?} as {filter}");

        filter
    }

    /// Records every dimension `phrase` belongs to. Returns whether any did.
    fn record(&self, phrase: &str, mentions: &mut Mentions) -> bool {
        let mut matched = false;

        if let Some(borough) = self.lexicon.boroughs.lookup(phrase) {
            mentions.borough.get_or_insert(borough);
            matched = true;
        }
        if let Some(vehicle) = self.lexicon.vehicles.lookup(phrase) {
            mentions.vehicles.insert(vehicle);
            matched = true;
        }
        if let Some(role) = self.lexicon.roles.lookup(phrase) {
            mentions.roles.insert(role);
            matched = true;
        }
        if let Some(year) = self.parse_year(phrase) {
            mentions.years = Some(match mentions.years {
                Some(range) => YearRange::new(range.start.min(year), range.end.max(year)),
                None => YearRange::single(year),
            });
            matched = true;
        }

        matched
    }

    fn parse_year(&self, token: &str) -> Option<i32> {
        if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        token.parse().ok().filter(|&year| self.window.contains(year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> TextInterpreter {
        TextInterpreter::new(Lexicon::embedded(), YearRange::new(2015, 2025))
    }

    #[test]
    fn borough_year_and_role() {
        let filter = interpreter().interpret("Brooklyn 2022 pedestrian crashes");
        assert_eq!(filter.borough, Some(Borough::Brooklyn));
        assert_eq!(filter.years, Some(YearRange::single(2022)));
        assert_eq!(
            filter.person_types,
            Some(BTreeSet::from([PersonRole::Pedestrian]))
        );
        assert_eq!(filter.vehicle_types, None);
        assert_eq!(filter.remainder.as_deref(), Some("crashes"));
    }

    #[test]
    fn unknown_words_restrict_nothing() {
        let filter = interpreter().interpret("purple unicorn crashes");
        assert!(filter.is_unrestricted());
        assert_eq!(filter.remainder.as_deref(), Some("purple unicorn crashes"));
    }

    #[test]
    fn empty_text() {
        assert_eq!(interpreter().interpret("   "), Filter::unrestricted());
    }

    #[test]
    fn multi_word_names() {
        let filter = interpreter().interpret("crashes on staten island");
        assert_eq!(filter.borough, Some(Borough::StatenIsland));
        assert_eq!(filter.remainder.as_deref(), Some("crashes on"));
    }

    #[test]
    fn longest_phrase_wins() {
        let filter = interpreter().interpret("passenger vehicle collisions");
        assert_eq!(
            filter.vehicle_types,
            Some(BTreeSet::from([VehicleCategory::PassengerVehicle]))
        );
        assert_eq!(filter.person_types, None);

        let filter = interpreter().interpret("fire truck");
        assert_eq!(
            filter.vehicle_types,
            Some(BTreeSet::from([VehicleCategory::EmergencyVehicle]))
        );
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let filter = interpreter().interpret("QUEENS, e-bike & SUV crashes!!");
        assert_eq!(filter.borough, Some(Borough::Queens));
        assert_eq!(
            filter.vehicle_types,
            Some(BTreeSet::from([
                VehicleCategory::SportUtilityVehicle,
                VehicleCategory::EBike,
            ]))
        );
    }

    #[test]
    fn first_borough_wins() {
        let filter = interpreter().interpret("manhattan versus the bronx");
        assert_eq!(filter.borough, Some(Borough::Manhattan));
    }

    #[test]
    fn years_form_a_range() {
        let filter = interpreter().interpret("between 2021 and 2017");
        assert_eq!(filter.years, Some(YearRange::new(2017, 2021)));
    }

    #[test]
    fn years_outside_the_window_are_plain_words() {
        let filter = interpreter().interpret("1999 12345 2030");
        assert_eq!(filter.years, None);
        assert_eq!(filter.remainder.as_deref(), Some("1999 12345 2030"));
    }

    #[test]
    fn synonyms_collapse_to_one_category() {
        let filter = interpreter().interpret("car and sedan crashes with drivers and passengers");
        assert_eq!(
            filter.vehicle_types,
            Some(BTreeSet::from([VehicleCategory::PassengerVehicle]))
        );
        assert_eq!(
            filter.person_types,
            Some(BTreeSet::from([PersonRole::Occupant]))
        );
    }

    #[test]
    fn negation_is_not_interpreted() {
        let filter = interpreter().interpret("not brooklyn");
        assert_eq!(filter.borough, Some(Borough::Brooklyn));
    }
}
