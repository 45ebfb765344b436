//! Canonical and fallback URL derivation.
//!
//! Listings: `/listings/{type}-for-{contract}-at-{location}-{id}`
//! Units: `/developer-unit/{beds}-bedroom-{type}-for-{contract}-in-{city}-unit-{id}`
//!
//! Missing fields take fixed placeholder segments, so the same input always
//! yields the same path.

use crate::config::SlugConfig;
use crate::models::{ListingRecord, LookupRecord, UnitRecord};
use crate::reference::ResourceKind;
use regex::Regex;
use std::sync::LazyLock;

/// Runs of anything that is not a lowercase letter or digit.
static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase, hyphen-separated form of free text.
///
/// # Examples
///
/// ```
/// use refresolve_core::resolver::slugify;
///
/// assert_eq!(slugify("East Legon, Accra"), "east-legon-accra");
/// assert_eq!(slugify("  --  "), "");
/// ```
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_SLUG
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

fn segment(value: Option<&str>, placeholder: &str) -> String {
    value
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

fn id_segment(record_id: Option<&str>, reference: &str) -> String {
    let from_record = record_id.map(slugify).filter(|s| !s.is_empty());
    from_record.unwrap_or_else(|| slugify(reference))
}

/// Path for a listing built from its structured fields.
pub fn listing_path(record: &ListingRecord, reference: &str) -> String {
    format!(
        "{}/{}-for-{}-at-{}-{}",
        SlugConfig::LISTING_ROOT,
        segment(record.property_type.as_deref(), SlugConfig::PLACEHOLDER_TYPE),
        segment(record.contract.as_deref(), SlugConfig::PLACEHOLDER_CONTRACT),
        segment(record.location.as_deref(), SlugConfig::PLACEHOLDER_LOCATION),
        id_segment(record.id.as_deref(), reference),
    )
}

/// Path for a unit built from its structured fields.
pub fn unit_path(record: &UnitRecord, reference: &str) -> String {
    format!(
        "{}/{}-bedroom-{}-for-{}-in-{}-unit-{}",
        SlugConfig::UNIT_ROOT,
        segment(record.bedrooms.as_deref(), SlugConfig::PLACEHOLDER_BEDS),
        segment(record.property_type.as_deref(), SlugConfig::PLACEHOLDER_TYPE),
        segment(record.contract.as_deref(), SlugConfig::PLACEHOLDER_CONTRACT),
        segment(record.city.as_deref(), SlugConfig::PLACEHOLDER_LOCATION),
        id_segment(record.id.as_deref(), reference),
    )
}

/// URL for a validated record.
///
/// A server-provided canonical path wins; otherwise the path is built from
/// the record's fields.
pub fn canonical_url(record: &LookupRecord, reference: &str) -> String {
    if let Some(path) = record.canonical_path() {
        return normalize_path(path);
    }
    match record {
        LookupRecord::Listing(listing) => listing_path(listing, reference),
        LookupRecord::Unit(unit) => unit_path(unit, reference),
    }
}

/// Best-effort URL for a reference with no record at all.
pub fn fallback_url(kind: ResourceKind, reference: &str) -> String {
    match kind.or_default() {
        ResourceKind::Unit => unit_path(&UnitRecord::default(), reference),
        _ => listing_path(&ListingRecord::default(), reference),
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Apartment"), "apartment");
        assert_eq!(slugify("Rent / Sale"), "rent-sale");
        assert_eq!(slugify("East Legon, Accra"), "east-legon-accra");
    }

    #[test]
    fn test_listing_path_from_fields() {
        let record = ListingRecord {
            id: Some("203456".into()),
            property_type: Some("Apartment".into()),
            contract: Some("Rent".into()),
            location: Some("East Legon".into()),
            ..Default::default()
        };
        assert_eq!(
            listing_path(&record, "203456"),
            "/listings/apartment-for-rent-at-east-legon-203456"
        );
    }

    #[test]
    fn test_unit_path_from_fields() {
        let record = UnitRecord {
            id: Some("102".into()),
            bedrooms: Some("3".into()),
            property_type: Some("Townhouse".into()),
            contract: Some("sale".into()),
            city: Some("Tema".into()),
            ..Default::default()
        };
        assert_eq!(
            unit_path(&record, "102"),
            "/developer-unit/3-bedroom-townhouse-for-sale-in-tema-unit-102"
        );
    }

    #[test]
    fn test_placeholders_fill_missing_fields() {
        let record = UnitRecord {
            id: Some("102".into()),
            city: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(
            unit_path(&record, "102"),
            "/developer-unit/multi-bedroom-property-for-rent-or-sale-in-accra-ghana-unit-102"
        );
    }

    #[test]
    fn test_canonical_path_preferred() {
        let record = LookupRecord::Listing(ListingRecord {
            id: Some("1".into()),
            canonical_path: Some("listings/custom-slug-1".into()),
            property_type: Some("House".into()),
            ..Default::default()
        });
        assert_eq!(canonical_url(&record, "1"), "/listings/custom-slug-1");
    }

    #[test]
    fn test_fallback_urls() {
        assert_eq!(
            fallback_url(ResourceKind::Property, "203456"),
            "/listings/property-for-rent-or-sale-at-accra-ghana-203456"
        );
        assert_eq!(
            fallback_url(ResourceKind::Unit, "AB12"),
            "/developer-unit/multi-bedroom-property-for-rent-or-sale-in-accra-ghana-unit-ab12"
        );
        assert_eq!(
            fallback_url(ResourceKind::Unknown, "9"),
            fallback_url(ResourceKind::Property, "9")
        );
    }
}
