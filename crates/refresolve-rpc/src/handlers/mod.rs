//! JSON-RPC request handlers, split by domain.

mod cache;
mod resolve;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use refresolve_core::{ResolveError, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> refresolve_core::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| ResolveError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract an optional bool parameter, supporting both snake_case and camelCase.
pub(crate) fn get_bool_param(params: &Value, snake: &str, camel: &str) -> Option<bool> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_bool())
}

/// Extract an optional u64 parameter, supporting both snake_case and camelCase.
pub(crate) fn get_u64_param(params: &Value, snake: &str, camel: &str) -> Option<u64> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_u64())
}

/// Extract an optional resource kind. `listing` is accepted for `property`.
pub(crate) fn get_kind_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> refresolve_core::Result<Option<ResourceKind>> {
    let Some(raw) = get_str_param(params, snake, camel) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "property" | "listing" => Ok(Some(ResourceKind::Property)),
        "unit" => Ok(Some(ResourceKind::Unit)),
        other => Err(ResolveError::InvalidParams {
            message: format!("Unknown {}: {}", snake, other),
        }),
    }
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> refresolve_core::Result<Value> {
    match method {
        // Resolution
        "resolve_reference" => resolve::resolve_reference(state, params).await,
        "quick_resolve" => resolve::quick_resolve(state, params),
        "classify_reference" => resolve::classify_reference(state, params),

        // Cache management
        "invalidate_reference" => cache::invalidate_reference(state, params),
        "clear_cache" => cache::clear_cache(state, params),
        "cache_stats" => cache::cache_stats(state, params),
        "purge_expired" => cache::purge_expired(state, params),

        _ => {
            warn!("Method not found: {}", method);
            Err(ResolveError::Unknown {
                message: format!("Method not found: {}", method),
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_response_success() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"url": "/x"}));
        assert!(response.error.is_none());
        assert!(response.result.is_some());
    }

    #[test]
    fn test_json_rpc_response_error() {
        let response = JsonRpcResponse::error(Some(json!(1)), -32005, "Bad input".into());
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32005);
    }

    #[test]
    fn test_params_accept_both_cases() {
        let params = json!({"timeoutMs": 500, "include_alternatives": false});
        assert_eq!(get_u64_param(&params, "timeout_ms", "timeoutMs"), Some(500));
        assert_eq!(
            get_bool_param(&params, "include_alternatives", "includeAlternatives"),
            Some(false)
        );
        assert!(require_str_param(&params, "reference", "reference").is_err());
    }

    #[test]
    fn test_kind_param() {
        let params = json!({"preferredKind": "Listing"});
        assert_eq!(
            get_kind_param(&params, "preferred_kind", "preferredKind").unwrap(),
            Some(ResourceKind::Property)
        );
        assert_eq!(
            get_kind_param(&json!({}), "preferred_kind", "preferredKind").unwrap(),
            None
        );

        let bad = json!({"preferred_kind": "boat"});
        assert!(get_kind_param(&bad, "preferred_kind", "preferredKind").is_err());
    }
}
