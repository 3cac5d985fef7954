//! Label tokenization shared by every phrase table.

use std::sync::LazyLock;

use regex::Regex;

/// Splits on anything that is not a lowercase ASCII letter or digit.
static TOKEN_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercases `text` and splits it into alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_SEPARATOR_RE
        .split(&lower)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(
            tokenize("E-Bike crashes, Staten  Island!"),
            vec!["e", "bike", "crashes", "staten", "island"]
        );
        assert!(tokenize(" -- ").is_empty());
    }
}
