//! Raw input cleanup and validation.
//!
//! Produces a [`Reference`] once per call. Nothing here touches the network or
//! the cache.

use crate::config::SlugConfig;
use crate::error::{ResolveError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefixes users type in front of the identifier, longest first.
const RECOGNIZED_PREFIXES: &[(&str, ReferencePrefix)] = &[
    ("UNIT", ReferencePrefix::Unit),
    ("PROP", ReferencePrefix::Prop),
    ("REF", ReferencePrefix::Ref),
    ("U", ReferencePrefix::U),
];

/// A recognized prefix stripped from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePrefix {
    Unit,
    U,
    Ref,
    Prop,
}

impl ReferencePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferencePrefix::Unit => "UNIT",
            ReferencePrefix::U => "U",
            ReferencePrefix::Ref => "REF",
            ReferencePrefix::Prop => "PROP",
        }
    }
}

/// An immutable, normalized reference.
///
/// `compact` keeps the cleaned input including any prefix, which the
/// classifier needs. `id` is the token sent to the lookup service and used
/// in cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    compact: String,
    id: String,
    prefix: Option<ReferencePrefix>,
}

impl Reference {
    /// The lookup token, prefix removed.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The cleaned, upper-cased input with its prefix intact.
    pub fn compact(&self) -> &str {
        &self.compact
    }

    pub fn prefix(&self) -> Option<ReferencePrefix> {
        self.prefix
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl TryFrom<&str> for Reference {
    type Error = ResolveError;

    fn try_from(raw: &str) -> Result<Self> {
        normalize(raw)
    }
}

/// Clean and validate raw user input.
///
/// # Rules Applied
/// 1. Drop whitespace and separator characters
/// 2. Reject empty input and anything outside `[A-Za-z0-9]`
/// 3. Upper-case
/// 4. Strip a recognized prefix when a digit follows it
/// 5. Reject ids longer than the maximum length
///
/// # Examples
///
/// ```
/// use refresolve_core::reference::normalize;
///
/// let r = normalize(" unit-102 ").unwrap();
/// assert_eq!(r.id(), "102");
/// assert_eq!(r.compact(), "UNIT102");
/// assert!(normalize("!!!").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<Reference> {
    let kept: Vec<char> = raw.chars().filter(|c| c.is_alphanumeric()).collect();

    if kept.is_empty() {
        return Err(ResolveError::invalid_format(
            raw,
            "reference contains no letters or digits",
        ));
    }

    // Checked before upper-casing: some letters expand to ASCII ('ß' to "SS").
    if let Some(bad) = kept.iter().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(ResolveError::invalid_format(
            raw,
            format!("unsupported character '{}'", bad),
        ));
    }

    let compact: String = kept.iter().map(char::to_ascii_uppercase).collect();

    let (id, prefix) = strip_prefix(&compact);

    if id.len() > SlugConfig::MAX_REFERENCE_LEN {
        return Err(ResolveError::invalid_format(
            raw,
            format!(
                "reference is longer than {} characters",
                SlugConfig::MAX_REFERENCE_LEN
            ),
        ));
    }

    Ok(Reference {
        id: id.to_string(),
        compact,
        prefix,
    })
}

fn strip_prefix(compact: &str) -> (&str, Option<ReferencePrefix>) {
    for (text, prefix) in RECOGNIZED_PREFIXES {
        if let Some(rest) = compact.strip_prefix(text) {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return (rest, Some(*prefix));
            }
        }
    }
    (compact, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_separators_and_uppercases() {
        let r = normalize("  ab-12_3 ").unwrap();
        assert_eq!(r.id(), "AB123");
        assert_eq!(r.compact(), "AB123");
        assert_eq!(r.prefix(), None);
    }

    #[test]
    fn test_strips_recognized_prefixes() {
        let cases = [
            ("UNIT102", "102", ReferencePrefix::Unit),
            ("u-77", "77", ReferencePrefix::U),
            ("Ref 203456", "203456", ReferencePrefix::Ref),
            ("prop#19", "19", ReferencePrefix::Prop),
        ];
        for (input, id, prefix) in cases {
            let r = normalize(input).unwrap();
            assert_eq!(r.id(), id, "input {input}");
            assert_eq!(r.prefix(), Some(prefix), "input {input}");
        }
    }

    #[test]
    fn test_prefix_kept_when_no_digit_follows() {
        let r = normalize("UB12").unwrap();
        assert_eq!(r.id(), "UB12");
        assert_eq!(r.prefix(), None);

        let r = normalize("REFX").unwrap();
        assert_eq!(r.id(), "REFX");
    }

    #[test]
    fn test_rejects_empty() {
        let err = normalize("!!!").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidFormat { .. }));
        assert!(normalize("   ").is_err());
    }

    #[test]
    fn test_rejects_too_long() {
        assert!(normalize("123456789012345678901").is_err());
        assert!(normalize("12345678901234567890").is_ok());
        // The prefix does not count toward the limit
        assert!(normalize("UNIT12345678901234567890").is_ok());
    }

    #[test]
    fn test_rejects_non_ascii_alphanumerics() {
        let err = normalize("caf\u{e9}12").unwrap_err();
        assert!(err.to_string().contains("unsupported character"));

        // Letters whose upper case is ASCII are still rejected.
        for input in ["\u{df}12", "\u{fb01}1", "unit\u{df}"] {
            let err = normalize(input).unwrap_err();
            assert!(
                matches!(err, ResolveError::InvalidFormat { .. }),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(normalize("unit 9").unwrap(), normalize("UNIT-9").unwrap());
    }
}
