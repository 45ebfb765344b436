//! Classification to search-strategy mapping.

use super::classifier::{ClassificationResult, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence at or above which the guessed kind is queried first with the
/// larger time budget.
pub const CONFIDENT_THRESHOLD: f64 = 0.8;
/// Confidence at or above which the guessed kind is still queried first.
pub const PLAUSIBLE_THRESHOLD: f64 = 0.6;

/// Which kind(s) to query, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum SearchStrategy {
    PrimaryFirst(ResourceKind),
    Sequential(ResourceKind),
    Parallel,
}

impl SearchStrategy {
    /// The kind queried first, if the strategy has one.
    ///
    /// `Unknown` is replaced by `Property`.
    pub fn primary(&self) -> Option<ResourceKind> {
        match self {
            SearchStrategy::PrimaryFirst(kind) | SearchStrategy::Sequential(kind) => {
                Some(kind.or_default())
            }
            SearchStrategy::Parallel => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchStrategy::PrimaryFirst(_) => "primary_first",
            SearchStrategy::Sequential(_) => "sequential",
            SearchStrategy::Parallel => "parallel",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary() {
            Some(kind) => write!(f, "{}({})", self.name(), kind),
            None => f.write_str(self.name()),
        }
    }
}

/// Pick a strategy from a classification.
pub fn select_strategy(classification: &ClassificationResult) -> SearchStrategy {
    let kind = classification.kind.or_default();
    if classification.kind == ResourceKind::Unknown {
        return SearchStrategy::Parallel;
    }
    if classification.confidence >= CONFIDENT_THRESHOLD {
        SearchStrategy::PrimaryFirst(kind)
    } else if classification.confidence >= PLAUSIBLE_THRESHOLD {
        SearchStrategy::Sequential(kind)
    } else {
        SearchStrategy::Parallel
    }
}
