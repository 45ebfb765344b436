//! Caller-facing result and options of `resolve_reference`.

use super::resolved::ResolvedResource;
use crate::cache::EntrySource;
use crate::cancel::CancellationToken;
use crate::error::ErrorCategory;
use crate::reference::{ResourceKind, SearchStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A second match offered next to the chosen one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub kind: ResourceKind,
    pub url: String,
    pub source: EntrySource,
}

impl From<&ResolvedResource> for Alternative {
    fn from(resource: &ResolvedResource) -> Self {
        Self {
            kind: resource.kind,
            url: resource.canonical_url.clone(),
            source: resource.source,
        }
    }
}

/// The single decision returned for every resolution.
///
/// Valid results carry a non-empty `url`; invalid ones carry an
/// `error_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResult {
    /// Normalized reference, or the raw input when normalization failed.
    pub reference: String,
    pub url: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub kind: ResourceKind,
    pub confidence: f64,
    /// Absent when the input never reached strategy selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SearchStrategy>,
    pub source: EntrySource,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,
}

/// Per-call options for `resolve_reference`.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Outer timeout; the configured default when `None`.
    pub timeout: Option<Duration>,
    /// Kind to query first, overriding the classifier's guess.
    pub preferred_kind: Option<ResourceKind>,
    pub include_alternatives: bool,
    /// Strategy to run, overriding selection entirely.
    pub strategy: Option<SearchStrategy>,
    /// Cancelling ends the wait like the outer timeout does.
    pub cancel: Option<CancellationToken>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            preferred_kind: None,
            include_alternatives: true,
            strategy: None,
            cancel: None,
        }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_preferred_kind(mut self, kind: ResourceKind) -> Self {
        self.preferred_kind = Some(kind);
        self
    }

    pub fn with_alternatives(mut self, include: bool) -> Self {
        self.include_alternatives = include;
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
