//! Outcome of a single-kind resolution.

use super::records::LookupRecord;
use crate::cache::{Cacheable, EntrySource};
use crate::reference::ResourceKind;
use serde::{Deserialize, Serialize};

/// A reference resolved to a URL for one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResource {
    pub kind: ResourceKind,
    /// Normalized reference id this resource was resolved from.
    pub reference: String,
    pub canonical_url: String,
    /// The validated record, absent for fallback resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_record: Option<LookupRecord>,
    pub source: EntrySource,
    pub response_time_ms: u64,
}

impl ResolvedResource {
    pub fn is_fallback(&self) -> bool {
        self.source == EntrySource::Fallback
    }
}

impl Cacheable for ResolvedResource {
    fn url(&self) -> &str {
        &self.canonical_url
    }

    fn source(&self) -> EntrySource {
        self.source
    }
}
