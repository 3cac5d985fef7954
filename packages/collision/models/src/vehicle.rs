//! Vehicle label mapping.
//!
//! Maps the free-form `VEHICLE TYPE CODE` labels of the collision dataset
//! to the canonical [`VehicleCategory`] values. Labels vary wildly in case
//! and spelling ("Sedan", "4 dr sedan", "Station Wagon/Sport Utility
//! Vehicle", "PK"), so classification is keyword based. The keyword rules
//! are data, embedded from `labels/vehicles.toml`.

use std::str::FromStr as _;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::VehicleCategory;
use crate::text::tokenize;

const RULES_TOML: &str = include_str!("../labels/vehicles.toml");

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    parse_rules(RULES_TOML)
        .unwrap_or_else(|e| panic!("Invalid embedded labels/vehicles.toml: {e}"))
});

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    category: String,
    keywords: Vec<String>,
}

/// A category and its keywords, each already tokenized.
#[derive(Debug)]
struct Rule {
    category: VehicleCategory,
    keywords: Vec<Vec<String>>,
}

impl Rule {
    fn matches_within(&self, tokens: &[String]) -> bool {
        self.keywords
            .iter()
            .any(|keyword| tokens.windows(keyword.len()).any(|w| w == keyword.as_slice()))
    }

    fn matches_exactly(&self, tokens: &[String]) -> bool {
        self.keywords.iter().any(|keyword| keyword.as_slice() == tokens)
    }
}

fn parse_rules(toml_str: &str) -> Result<Vec<Rule>, String> {
    let file: RuleFile = toml::de::from_str(toml_str).map_err(|e| e.to_string())?;

    file.rules
        .into_iter()
        .map(|entry| {
            let category = VehicleCategory::from_str(&entry.category)
                .map_err(|_| format!("unknown category '{}'", entry.category))?;
            let keywords = entry
                .keywords
                .iter()
                .map(|keyword| {
                    let tokens = tokenize(keyword);
                    if tokens.is_empty() {
                        Err(format!("blank keyword for {category}"))
                    } else {
                        Ok(tokens)
                    }
                })
                .collect::<Result<_, _>>()?;
            Ok(Rule { category, keywords })
        })
        .collect()
}

/// Maps a raw vehicle label to its category.
///
/// Returns `None` for blank labels and [`VehicleCategory::Other`] for
/// labels no keyword recognizes. A keyword matches a whole run of tokens
/// anywhere in the label, and the first matching rule wins.
#[must_use]
pub fn categorize(raw: &str) -> Option<VehicleCategory> {
    let tokens = tokenize(raw);
    match tokens.as_slice() {
        [] => return None,
        [only] if only == "unknown" || only == "unspecified" => return None,
        _ => {}
    }

    Some(
        RULES
            .iter()
            .find(|rule| rule.matches_within(&tokens))
            .map_or(VehicleCategory::Other, |rule| rule.category),
    )
}

/// Looks up a label that is exactly one keyword ("Sedan", "E-Bike",
/// "pick-up truck"). Labels merely containing a keyword are not matched.
#[must_use]
pub fn from_label(raw: &str) -> Option<VehicleCategory> {
    let tokens = tokenize(raw);
    RULES
        .iter()
        .find(|rule| rule.matches_exactly(&tokens))
        .map(|rule| rule.category)
}
