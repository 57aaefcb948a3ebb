use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Optional area code (parentheses and any run of separators allowed), a 3-digit
/// exchange, an optional single separator and a 4-digit subscriber number.
/// Separators are hyphens, dots or ASCII whitespace. Word boundaries are ASCII
/// too: any non-ASCII character counts as a non-word character.
static PHONE_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"(?-u:\b)(?:\(?[0-9]{3}\)?[-.\t\n\f\r ]*)?[0-9]{3}[-.\t\n\f\r ]?[0-9]{4}(?-u:\b)",
    )
    .case_insensitive(true)
    .build()
    .expect("hard-coded regular expression should be valid")
});

/// Returns every phone-number-shaped substring of `text`, leftmost first and
/// non-overlapping.
pub fn extract_phone_numbers(text: &str) -> Vec<String> {
    PHONE_NUMBER_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
