//! Records returned by the lookup service.
//!
//! Field names follow the service's JSON, which mixes snake_case and
//! camelCase; serde aliases accept both. Unrecognized fields are kept in
//! `extra` so the raw record survives the round trip.

use crate::error::{ResolveError, Result};
use crate::reference::ResourceKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A standalone listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(default, deserialize_with = "string_or_number", alias = "listingId")]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        alias = "referenceId",
        alias = "reference_id"
    )]
    pub reference: Option<String>,
    #[serde(
        default,
        alias = "canonicalPath",
        alias = "canonical_url",
        alias = "canonicalUrl"
    )]
    pub canonical_path: Option<String>,
    #[serde(default, alias = "propertyType", alias = "type")]
    pub property_type: Option<String>,
    #[serde(default, alias = "contractType", alias = "contract_type")]
    pub contract: Option<String>,
    #[serde(default, alias = "city")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A developer-managed unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    #[serde(default, deserialize_with = "string_or_number", alias = "unitId")]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        alias = "referenceId",
        alias = "reference_id"
    )]
    pub reference: Option<String>,
    #[serde(
        default,
        alias = "canonicalPath",
        alias = "canonical_url",
        alias = "canonicalUrl"
    )]
    pub canonical_path: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", alias = "beds")]
    pub bedrooms: Option<String>,
    #[serde(default, alias = "unitType", alias = "propertyType", alias = "type")]
    pub property_type: Option<String>,
    #[serde(default, alias = "contractType", alias = "contract_type")]
    pub contract: Option<String>,
    #[serde(default, alias = "location")]
    pub city: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A validated record of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum LookupRecord {
    Listing(ListingRecord),
    Unit(UnitRecord),
}

impl LookupRecord {
    pub fn kind(&self) -> ResourceKind {
        match self {
            LookupRecord::Listing(_) => ResourceKind::Property,
            LookupRecord::Unit(_) => ResourceKind::Unit,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            LookupRecord::Listing(r) => r.id.as_deref(),
            LookupRecord::Unit(r) => r.id.as_deref(),
        }
    }

    pub fn canonical_path(&self) -> Option<&str> {
        let path = match self {
            LookupRecord::Listing(r) => r.canonical_path.as_deref(),
            LookupRecord::Unit(r) => r.canonical_path.as_deref(),
        };
        path.map(str::trim).filter(|p| !p.is_empty())
    }

    /// Reject records that cannot produce a URL.
    ///
    /// A record needs a canonical path or an id; anything else must not be
    /// cached.
    pub fn validate(self) -> Result<Self> {
        let has_id = self.id().is_some_and(|id| !id.trim().is_empty());
        if self.canonical_path().is_none() && !has_id {
            return Err(ResolveError::InvalidRecord {
                message: format!("{} record has neither a canonical path nor an id", self.kind()),
            });
        }
        Ok(self)
    }

    /// Parse a response body into a record of `kind`.
    ///
    /// Accepts a bare record or one wrapped as `{"data": {...}}`.
    pub fn from_response(kind: ResourceKind, body: Value) -> Result<Self> {
        let body = unwrap_envelope(body);
        if !body.is_object() {
            return Err(ResolveError::InvalidRecord {
                message: format!("expected a JSON object for {} record", kind),
            });
        }

        let record = match kind {
            ResourceKind::Unit => serde_json::from_value(body).map(LookupRecord::Unit),
            _ => serde_json::from_value(body).map(LookupRecord::Listing),
        }
        .map_err(|e| ResolveError::InvalidRecord {
            message: format!("malformed {} record: {}", kind, e),
        })?;

        record.validate()
    }
}

fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
