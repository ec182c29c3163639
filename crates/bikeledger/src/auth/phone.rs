//! Phone number normalisation for the one-time-code strategies.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn e164_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+\d{10,15}$").expect("E.164 pattern is valid"))
}

/// Normalise a phone number to `+<digits>`.
///
/// Spaces, dashes, dots and parentheses are dropped. Numbers without a
/// leading `+` get `country_code` prefixed (a leading `0` trunk prefix is
/// removed first).
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if the result is not `+` followed by
/// 10 to 15 digits.
pub fn normalize(raw: &str, country_code: &str) -> Result<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if compact.is_empty() {
        return Err(Error::MissingField { field: "phone" });
    }

    let normalized = if compact.starts_with('+') {
        compact
    } else {
        format!("{country_code}{}", compact.trim_start_matches('0'))
    };

    if e164_pattern().is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(Error::invalid(
            "phone",
            format!("{raw:?} is not a valid number (expected 10 to 15 digits)"),
        ))
    }
}
