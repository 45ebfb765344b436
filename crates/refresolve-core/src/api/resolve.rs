//! Resolution methods.

use crate::error::Result;
use crate::models::{ResolveOptions, UnifiedResult};
use crate::reference::{classify, normalize, ClassificationResult};
use crate::ReferenceResolver;
use tokio::task::JoinHandle;

impl ReferenceResolver {
    /// Resolve a raw reference into a URL.
    ///
    /// Never fails: invalid input, missing references and unreachable
    /// services are all reported inside the returned [`UnifiedResult`].
    pub async fn resolve_reference(
        &self,
        input: &str,
        options: &ResolveOptions,
    ) -> UnifiedResult {
        self.inner.resolve(input, options).await
    }

    /// Best-effort URL without any network access.
    pub fn quick_resolve(&self, input: &str) -> UnifiedResult {
        self.inner.quick_resolve(input)
    }

    /// Resolve in a background task so a later call is served from cache.
    ///
    /// Meant to follow [`quick_resolve`](Self::quick_resolve). Must be called
    /// from within a Tokio runtime.
    pub fn verify_in_background(&self, input: &str) -> JoinHandle<UnifiedResult> {
        let resolver = self.clone();
        let input = input.to_string();
        tokio::spawn(async move {
            resolver
                .resolve_reference(&input, &ResolveOptions::default())
                .await
        })
    }

    /// Classify a reference without resolving it.
    pub fn classify_reference(&self, input: &str) -> Result<ClassificationResult> {
        let reference = normalize(input)?;
        Ok(classify(&reference))
    }
}
