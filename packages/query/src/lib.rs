#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolution of dashboard requests into canonical filters.
//!
//! Dropdown selections go through the [`FilterNormalizer`], the search
//! phrase through the [`TextInterpreter`], and [`FilterResolver`] merges
//! the two so that a dropdown selection always beats a text mention of the
//! same dimension.

pub mod interpreter;
pub mod normalizer;
pub mod vocabulary;

pub use interpreter::TextInterpreter;
pub use normalizer::FilterNormalizer;
pub use vocabulary::Lexicon;

use crash_dash_collision_models::YearRange;
use crash_dash_query_models::{Filter, FilterRequest, SelectionField};
use thiserror::Error;

/// Errors that can occur while resolving a request.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A dropdown value outside its known enumeration.
    #[error("Invalid {field} selection: '{value}'")]
    InvalidSelection {
        /// Which dropdown the value came from.
        field: SelectionField,
        /// The rejected value.
        value: String,
    },

    /// A vocabulary file could not be loaded.
    #[error("Vocabulary error in {name}: {message}")]
    Vocabulary {
        /// Vocabulary name (e.g. `"boroughs"`).
        name: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl QueryError {
    pub(crate) fn invalid(field: SelectionField, value: &str) -> Self {
        Self::InvalidSelection {
            field,
            value: value.to_owned(),
        }
    }
}

/// Normalizes selections, interprets text and merges the two.
#[derive(Debug, Clone)]
pub struct FilterResolver {
    normalizer: FilterNormalizer,
    interpreter: TextInterpreter,
}

impl FilterResolver {
    #[must_use]
    pub const fn new(normalizer: FilterNormalizer, interpreter: TextInterpreter) -> Self {
        Self {
            normalizer,
            interpreter,
        }
    }

    /// A resolver using the embedded vocabularies and the given dataset
    /// year window.
    #[must_use]
    pub fn with_window(window: YearRange) -> Self {
        Self::new(
            FilterNormalizer::new(window),
            TextInterpreter::new(Lexicon::embedded(), window),
        )
    }

    /// Resolves a request into one filter. Dropdown values win over text.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidSelection`] if a dropdown value is
    /// invalid. The text never causes an error.
    pub fn resolve(&self, request: &FilterRequest) -> Result<Filter, QueryError> {
        let dropdown = self.normalizer.normalize(request)?;
        let text = request
            .text
            .as_deref()
            .map(|t| self.interpreter.interpret(t))
            .unwrap_or_default();

        Ok(Filter::merge(dropdown, text))
    }
}
