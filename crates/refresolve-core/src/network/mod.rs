//! Networking for reference lookups.
//!
//! - [`retry`]: per-attempt timeout with exponential backoff
//! - [`client`]: reqwest wrapper with status classification
//! - [`lookup`]: the `LookupService` boundary and its HTTP implementation

pub mod client;
pub mod lookup;
pub mod retry;

pub use client::{extract_domain, HttpClient};
pub use lookup::{HttpLookupService, LookupService};
pub use retry::{retry_with_timeout, RetryConfig, RetryStats};
