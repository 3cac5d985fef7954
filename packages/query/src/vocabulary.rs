//! Phrase vocabularies for free-text interpretation.
//!
//! Each filter dimension has a TOML file under `vocabulary/` mapping
//! phrases to one canonical value. The files are embedded at compile time;
//! adding a synonym is a data change. Phrases go through the same
//! [`tokenize`] pipeline as the query text, so "E-Bike" in a vocabulary
//! file and "e bike" typed by a user meet as `"e bike"`.

use std::collections::BTreeMap;
use std::str::FromStr;

use crash_dash_collision_models::{Borough, PersonRole, VehicleCategory};
use serde::Deserialize;

use crate::QueryError;

pub use crash_dash_collision_models::text::tokenize;

/// Longest phrase, in tokens, a vocabulary may contain.
pub const MAX_PHRASE_TOKENS: usize = 3;

const BOROUGHS_TOML: &str = include_str!("../vocabulary/boroughs.toml");
const VEHICLES_TOML: &str = include_str!("../vocabulary/vehicles.toml");
const ROLES_TOML: &str = include_str!("../vocabulary/roles.toml");

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    entries: Vec<VocabularyEntry>,
}

#[derive(Debug, Deserialize)]
struct VocabularyEntry {
    value: String,
    phrases: Vec<String>,
}

/// Normalized phrase to value lookup for one dimension.
#[derive(Debug, Clone)]
pub struct Vocabulary<T> {
    phrases: BTreeMap<String, T>,
}

impl<T: Copy + FromStr + PartialEq + std::fmt::Debug> Vocabulary<T> {
    /// Parses a vocabulary file.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Vocabulary`] if the TOML is malformed, a value
    /// does not parse as `T`, a phrase is blank or longer than
    /// [`MAX_PHRASE_TOKENS`], or one phrase maps to two different values.
    pub fn from_toml(name: &str, toml_str: &str) -> Result<Self, QueryError> {
        let vocabulary_error = |message: String| QueryError::Vocabulary {
            name: name.to_owned(),
            message,
        };

        let file: VocabularyFile =
            toml::de::from_str(toml_str).map_err(|e| vocabulary_error(e.to_string()))?;

        let mut phrases = BTreeMap::new();
        for entry in file.entries {
            let value = T::from_str(&entry.value)
                .map_err(|_| vocabulary_error(format!("unknown value '{}'", entry.value)))?;

            for phrase in &entry.phrases {
                let tokens = tokenize(phrase);
                if tokens.is_empty() || tokens.len() > MAX_PHRASE_TOKENS {
                    return Err(vocabulary_error(format!(
                        "phrase '{phrase}' must have 1 to {MAX_PHRASE_TOKENS} words"
                    )));
                }
                let key = tokens.join(" ");
                if let Some(existing) = phrases.insert(key, value)
                    && existing != value
                {
                    return Err(vocabulary_error(format!(
                        "phrase '{phrase}' maps to both {existing:?} and {value:?}"
                    )));
                }
            }
        }

        log::debug!("Loaded {} phrases into {name} vocabulary", phrases.len());

        Ok(Self { phrases })
    }

    /// Looks up an already-normalized phrase (tokens joined by one space).
    #[must_use]
    pub fn lookup(&self, phrase: &str) -> Option<T> {
        self.phrases.get(phrase).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// The vocabularies of every text-matchable dimension.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub boroughs: Vocabulary<Borough>,
    pub vehicles: Vocabulary<VehicleCategory>,
    pub roles: Vocabulary<PersonRole>,
}

impl Lexicon {
    /// Builds the lexicon from the vocabularies embedded in the crate.
    ///
    /// # Panics
    ///
    /// Panics if an embedded vocabulary is malformed (these are checked by
    /// the tests below).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(BOROUGHS_TOML, VEHICLES_TOML, ROLES_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded vocabulary: {e}"))
    }

    /// Builds a lexicon from custom vocabulary files.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Vocabulary`] if any file is invalid.
    pub fn from_toml(boroughs: &str, vehicles: &str, roles: &str) -> Result<Self, QueryError> {
        Ok(Self {
            boroughs: Vocabulary::from_toml("boroughs", boroughs)?,
            vehicles: Vocabulary::from_toml("vehicles", vehicles)?,
            roles: Vocabulary::from_toml("roles", roles)?,
        })
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_vocabularies_parse() {
        let lexicon = Lexicon::embedded();
        assert!(!lexicon.boroughs.is_empty());
        assert!(!lexicon.vehicles.is_empty());
        assert!(!lexicon.roles.is_empty());
    }

    #[test]
    fn every_borough_and_role_is_reachable() {
        let lexicon = Lexicon::embedded();
        for borough in Borough::all() {
            assert!(
                lexicon.boroughs.phrases.values().any(|b| b == borough),
                "{borough:?} has no phrase"
            );
        }
        for role in PersonRole::all() {
            assert!(
                lexicon.roles.phrases.values().any(|r| r == role),
                "{role:?} has no phrase"
            );
        }
    }

    #[test]
    fn synonyms_map_many_to_one() {
        let lexicon = Lexicon::embedded();
        assert_eq!(
            lexicon.vehicles.lookup("car"),
            Some(VehicleCategory::PassengerVehicle)
        );
        assert_eq!(
            lexicon.vehicles.lookup("sedan"),
            Some(VehicleCategory::PassengerVehicle)
        );
        assert_eq!(
            lexicon.vehicles.lookup("e bike"),
            Some(VehicleCategory::EBike)
        );
        assert_eq!(
            lexicon.boroughs.lookup("staten island"),
            Some(Borough::StatenIsland)
        );
        assert_eq!(lexicon.roles.lookup("driver"), Some(PersonRole::Occupant));
    }

    #[test]
    fn rejects_unknown_values() {
        let err = Vocabulary::<Borough>::from_toml(
            "boroughs",
            "[[entries]]\nvalue = \"HOBOKEN\"\nphrases = [\"hoboken\"]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("HOBOKEN"));
    }

    #[test]
    fn rejects_long_phrases() {
        let result = Vocabulary::<Borough>::from_toml(
            "boroughs",
            "[[entries]]\nvalue = \"BRONX\"\nphrases = [\"the borough of the bronx\"]\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_conflicting_phrases() {
        let result = Vocabulary::<Borough>::from_toml(
            "boroughs",
            "[[entries]]\nvalue = \"BRONX\"\nphrases = [\"bx\"]\n\n\
             [[entries]]\nvalue = \"QUEENS\"\nphrases = [\"bx\"]\n",
        );
        assert!(result.is_err());
    }
}
