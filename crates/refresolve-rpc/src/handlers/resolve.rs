//! Resolution handlers.

use super::{get_bool_param, get_kind_param, get_u64_param, require_str_param};
use crate::server::AppState;
use refresolve_core::ResolveOptions;
use serde_json::Value;
use std::time::Duration;

pub async fn resolve_reference(
    state: &AppState,
    params: &Value,
) -> refresolve_core::Result<Value> {
    let reference = require_str_param(params, "reference", "reference")?;

    let mut options = ResolveOptions::default();
    if let Some(ms) = get_u64_param(params, "timeout_ms", "timeoutMs") {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(kind) = get_kind_param(params, "preferred_kind", "preferredKind")? {
        options = options.with_preferred_kind(kind);
    }
    if let Some(include) = get_bool_param(params, "include_alternatives", "includeAlternatives") {
        options = options.with_alternatives(include);
    }

    let result = state.resolver.resolve_reference(&reference, &options).await;
    Ok(serde_json::to_value(result)?)
}

/// Fallback URL now, full resolution in the background unless
/// `verify` is false.
pub fn quick_resolve(state: &AppState, params: &Value) -> refresolve_core::Result<Value> {
    let reference = require_str_param(params, "reference", "reference")?;
    let result = state.resolver.quick_resolve(&reference);

    if result.is_valid && get_bool_param(params, "verify", "verify").unwrap_or(true) {
        // Detached; the outcome lands in the cache.
        drop(state.resolver.verify_in_background(&reference));
    }
    Ok(serde_json::to_value(result)?)
}

pub fn classify_reference(state: &AppState, params: &Value) -> refresolve_core::Result<Value> {
    let reference = require_str_param(params, "reference", "reference")?;
    let classification = state.resolver.classify_reference(&reference)?;
    Ok(serde_json::to_value(classification)?)
}
