//! Heuristic resource-kind classification.
//!
//! Ordered pattern rules, first match wins. Each rule carries a fixed
//! confidence, so identical input always yields an identical result.

use super::normalizer::Reference;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static UNIT_PREFIXED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^U\d+$").unwrap());
static LISTING_PREFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:REF|PROP)\d+$").unwrap());
static SIX_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());
static LETTER_THEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d+$").unwrap());
static DIGITS_THEN_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[A-Z]$").unwrap());
static FOUR_OR_FIVE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4,5}$").unwrap());
static SEVEN_PLUS_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{7,}$").unwrap());
static ALL_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// The two resource kinds a reference can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A standalone listing.
    Property,
    /// A developer-managed unit.
    Unit,
    Unknown,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Property => "property",
            ResourceKind::Unit => "unit",
            ResourceKind::Unknown => "unknown",
        }
    }

    /// The kind to query when exactly one must be picked.
    ///
    /// `Unknown` falls back to `Property`, the more established kind.
    pub fn or_default(self) -> ResourceKind {
        match self {
            ResourceKind::Unknown => ResourceKind::Property,
            kind => kind,
        }
    }

    /// The other concrete kind.
    pub fn other(self) -> ResourceKind {
        match self.or_default() {
            ResourceKind::Property => ResourceKind::Unit,
            _ => ResourceKind::Property,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub kind: ResourceKind,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub reasoning: String,
}

impl ClassificationResult {
    fn new(kind: ResourceKind, confidence: f64, reasoning: &str) -> Self {
        Self {
            kind,
            confidence,
            reasoning: reasoning.to_string(),
        }
    }
}

/// Classify a normalized reference.
///
/// Prefix rules look at the compact form; the shape rules look at the
/// lookup id.
pub fn classify(reference: &Reference) -> ClassificationResult {
    use ResourceKind::{Property, Unit, Unknown};

    let compact = reference.compact();
    let id = reference.id();

    if compact.contains("UNIT") || UNIT_PREFIXED.is_match(compact) {
        return ClassificationResult::new(Unit, 0.95, "unit prefix");
    }
    if LISTING_PREFIXED.is_match(compact) {
        return ClassificationResult::new(Property, 0.90, "listing prefix");
    }
    if SIX_DIGITS.is_match(id) {
        return ClassificationResult::new(Property, 0.85, "six-digit listing number");
    }
    if LETTER_THEN_DIGITS.is_match(id) {
        return ClassificationResult::new(Unit, 0.80, "single letter followed by digits");
    }
    if DIGITS_THEN_LETTER.is_match(id) {
        return ClassificationResult::new(Unit, 0.75, "digits followed by a single letter");
    }

    let has_letter = id.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = id.chars().any(|c| c.is_ascii_digit());

    if has_letter && has_digit && id.len() > 4 {
        return ClassificationResult::new(Unit, 0.70, "long mixed letters and digits");
    }
    if FOUR_OR_FIVE_DIGITS.is_match(id) {
        return ClassificationResult::new(Property, 0.65, "four or five digits");
    }
    if SEVEN_PLUS_DIGITS.is_match(id) {
        return ClassificationResult::new(Unit, 0.60, "seven or more digits");
    }
    if ALL_DIGITS.is_match(id) {
        return ClassificationResult::new(Property, 0.55, "short number, defaulting to listing");
    }
    if has_letter && has_digit {
        return ClassificationResult::new(Unit, 0.40, "short mixed letters and digits");
    }

    ClassificationResult::new(Unknown, 0.20, "no pattern matched")
}
