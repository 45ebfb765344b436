//! Boundary to the remote lookup service.

use super::client::HttpClient;
use crate::config::ResolverSettings;
use crate::error::{ResolveError, Result};
use crate::models::{ListingRecord, LookupRecord, UnitRecord};
use crate::reference::ResourceKind;
use async_trait::async_trait;
use tracing::debug;

/// Read-only lookups by reference id.
///
/// Implementations report a missing reference as
/// [`ResolveError::NotFound`] and malformed payloads as
/// [`ResolveError::InvalidRecord`]; both are terminal for the resolver.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn lookup_listing(&self, id: &str) -> Result<ListingRecord>;

    async fn lookup_unit(&self, id: &str) -> Result<UnitRecord>;

    /// Dispatch on kind. `Unknown` is looked up as a listing.
    async fn lookup(&self, kind: ResourceKind, id: &str) -> Result<LookupRecord> {
        match kind {
            ResourceKind::Unit => self.lookup_unit(id).await.map(LookupRecord::Unit),
            _ => self.lookup_listing(id).await.map(LookupRecord::Listing),
        }
    }
}

/// [`LookupService`] over HTTP.
///
/// Endpoint templates contain an `{id}` placeholder, filled with the
/// URL-encoded reference id.
pub struct HttpLookupService {
    client: HttpClient,
    base_url: String,
    listing_endpoint: String,
    unit_endpoint: String,
}

impl HttpLookupService {
    pub fn new(settings: &ResolverSettings) -> Result<Self> {
        let client = HttpClient::with_timeout(settings.standalone_attempt_timeout())?;
        Self::with_client(client, settings)
    }

    pub fn with_client(client: HttpClient, settings: &ResolverSettings) -> Result<Self> {
        url::Url::parse(&settings.api_base_url).map_err(|e| ResolveError::Config {
            message: format!("Invalid api_base_url '{}': {}", settings.api_base_url, e),
        })?;

        for template in [&settings.listing_endpoint, &settings.unit_endpoint] {
            if !template.contains("{id}") {
                return Err(ResolveError::Config {
                    message: format!("Endpoint template '{}' has no {{id}} placeholder", template),
                });
            }
        }

        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            listing_endpoint: settings.listing_endpoint.clone(),
            unit_endpoint: settings.unit_endpoint.clone(),
        })
    }

    /// Full URL for a lookup of `kind`.
    pub fn endpoint_url(&self, kind: ResourceKind, id: &str) -> String {
        let template = match kind {
            ResourceKind::Unit => &self.unit_endpoint,
            _ => &self.listing_endpoint,
        };
        let path = template.replace("{id}", &urlencoding::encode(id));
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn fetch(&self, kind: ResourceKind, id: &str) -> Result<LookupRecord> {
        let url = self.endpoint_url(kind, id);
        debug!("Looking up {} reference {} at {}", kind, id, url);

        match self.client.get_json(&url).await? {
            Some(body) => LookupRecord::from_response(kind, body),
            None => Err(ResolveError::NotFound {
                kind,
                reference: id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl LookupService for HttpLookupService {
    async fn lookup_listing(&self, id: &str) -> Result<ListingRecord> {
        match self.fetch(ResourceKind::Property, id).await? {
            LookupRecord::Listing(record) => Ok(record),
            LookupRecord::Unit(_) => Err(ResolveError::InvalidRecord {
                message: "expected a listing record".to_string(),
            }),
        }
    }

    async fn lookup_unit(&self, id: &str) -> Result<UnitRecord> {
        match self.fetch(ResourceKind::Unit, id).await? {
            LookupRecord::Unit(record) => Ok(record),
            LookupRecord::Listing(_) => Err(ResolveError::InvalidRecord {
                message: "expected a unit record".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpLookupService {
        let settings = ResolverSettings {
            api_base_url: base.to_string(),
            ..Default::default()
        };
        HttpLookupService::new(&settings).unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let svc = service("https://lookup.example.com/api/");
        assert_eq!(
            svc.endpoint_url(ResourceKind::Property, "203456"),
            "https://lookup.example.com/api/listings/reference/203456"
        );
        assert_eq!(
            svc.endpoint_url(ResourceKind::Unit, "102"),
            "https://lookup.example.com/api/developer-units/reference/102"
        );
        assert_eq!(
            svc.endpoint_url(ResourceKind::Unknown, "A B"),
            "https://lookup.example.com/api/listings/reference/A%20B"
        );
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let settings = ResolverSettings {
            unit_endpoint: "/units".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpLookupService::new(&settings),
            Err(ResolveError::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let settings = ResolverSettings {
            api_base_url: "::nope".to_string(),
            ..Default::default()
        };
        assert!(HttpLookupService::new(&settings).is_err());
    }
}
