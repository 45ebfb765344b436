//! Reference parsing: normalization, classification and strategy selection.
//!
//! Everything in this module is pure and synchronous.

mod classifier;
mod normalizer;
mod strategy;

pub use classifier::{classify, ClassificationResult, ResourceKind};
pub use normalizer::{normalize, Reference, ReferencePrefix};
pub use strategy::{select_strategy, SearchStrategy, CONFIDENT_THRESHOLD, PLAUSIBLE_THRESHOLD};
