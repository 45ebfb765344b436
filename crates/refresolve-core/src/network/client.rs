//! HTTP client for the lookup service.
//!
//! Wraps reqwest with:
//! - Status-code classification into the resolver's error taxonomy
//! - A default per-request timeout
//! - User-agent management

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// HTTP client that turns responses into JSON or a typed failure.
pub struct HttpClient {
    client: Client,
    /// Reported in timeout errors.
    default_timeout: Duration,
}

impl HttpClient {
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(ResolverConfig::USER_AGENT)
            .build()
            .map_err(|e| ResolveError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// GET a JSON document.
    ///
    /// Returns `Ok(None)` for 404 so the caller can attach its own
    /// not-found context.
    pub async fn get_json(&self, url: &str) -> Result<Option<serde_json::Value>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(self.status_error(status, url));
        }

        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ResolveError::InvalidRecord {
                message: format!("Response from {} is not JSON: {}", extract_domain(url), e),
            })?;
        Ok(Some(value))
    }

    /// Check if an HTTP status code indicates a retryable error.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 408 | 429 | 500..=599)
    }

    /// Map a non-success, non-404 status onto the error taxonomy.
    pub fn status_error(&self, status: StatusCode, url: &str) -> ResolveError {
        match status.as_u16() {
            408 | 504 => ResolveError::Timeout(self.default_timeout),
            code if Self::is_retryable_status(status) => ResolveError::Network {
                message: format!("{} returned {}", extract_domain(url), status),
                status_code: Some(code),
            },
            _ => ResolveError::Unknown {
                message: format!("Unexpected status {} from {}", status, extract_domain(url)),
            },
        }
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> ResolveError {
        if e.is_timeout() {
            ResolveError::Timeout(self.default_timeout)
        } else {
            ResolveError::Network {
                message: format!("GET {} failed: {}", extract_domain(url), e),
                status_code: None,
            }
        }
    }
}

/// Extract the host from a URL for log and error messages.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
