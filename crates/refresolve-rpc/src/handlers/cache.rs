//! Cache management handlers.

use super::require_str_param;
use crate::server::AppState;
use serde_json::{json, Value};

pub fn invalidate_reference(state: &AppState, params: &Value) -> refresolve_core::Result<Value> {
    let reference = require_str_param(params, "reference", "reference")?;
    let removed = state.resolver.invalidate_reference(&reference)?;
    Ok(json!({"success": true, "removed": removed}))
}

pub fn clear_cache(state: &AppState, _params: &Value) -> refresolve_core::Result<Value> {
    state.resolver.clear_cache();
    Ok(json!({"success": true}))
}

pub fn cache_stats(state: &AppState, _params: &Value) -> refresolve_core::Result<Value> {
    Ok(serde_json::to_value(state.resolver.cache_stats())?)
}

pub fn purge_expired(state: &AppState, _params: &Value) -> refresolve_core::Result<Value> {
    let purged = state.resolver.purge_expired();
    Ok(json!({"success": true, "purged": purged}))
}
