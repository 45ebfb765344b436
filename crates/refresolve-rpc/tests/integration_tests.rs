//! Integration tests for the refresolve-rpc JSON-RPC server.
//!
//! A stub lookup service and the RPC server both run in-process on
//! ephemeral ports; the tests talk to the RPC server over HTTP.

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use refresolve_core::{ReferenceResolver, ResolverSettings};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;

async fn listing(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        "203456" => Ok(Json(json!({
            "id": 203456,
            "propertyType": "House",
            "contractType": "sale",
            "location": "East Legon"
        }))),
        "500" => Err(StatusCode::SERVICE_UNAVAILABLE),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn unit(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        "102" => Ok(Json(json!({
            "data": {
                "id": "102",
                "bedrooms": 2,
                "canonicalPath": "/developer-unit/custom-102"
            }
        }))),
        "500" => Err(StatusCode::SERVICE_UNAVAILABLE),
        "700" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(StatusCode::NOT_FOUND)
        }
        _ => Err(StatusCode::NOT_FOUND),
    }
}

/// Start the stub lookup service, returning its base URL.
async fn start_lookup_stub() -> String {
    let app = Router::new()
        .route("/api/listings/reference/:id", get(listing))
        .route("/api/developer-units/reference/:id", get(unit));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", addr)
}

/// Start the stub and an RPC server resolving against it.
async fn start_stack() -> SocketAddr {
    let settings = ResolverSettings {
        api_base_url: start_lookup_stub().await,
        backoff_base_ms: 10,
        backoff_max_ms: 20,
        ..Default::default()
    };
    let resolver = ReferenceResolver::with_settings(settings).unwrap();
    refresolve_rpc::start_server(resolver, "127.0.0.1", 0)
        .await
        .unwrap()
}

/// Make an RPC call and return the full JSON-RPC payload.
async fn rpc_call_raw(addr: SocketAddr, method: &str, params: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{}/rpc", addr))
        .json(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()
}

/// Make an RPC call, expecting a result.
async fn rpc_call(addr: SocketAddr, method: &str, params: Value) -> Value {
    let response = rpc_call_raw(addr, method, params).await;
    assert!(response.get("error").is_none(), "unexpected error: {}", response);
    response["result"].clone()
}

#[tokio::test]
async fn test_health_endpoints() {
    let addr = start_stack().await;

    let health: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let result = rpc_call(addr, "health_check", json!({})).await;
    assert_eq!(result["status"], "ok");
}

#[tokio::test]
async fn test_resolve_unit_uses_server_path() {
    let addr = start_stack().await;

    let result = rpc_call(addr, "resolve_reference", json!({"reference": "UNIT102"})).await;

    assert_eq!(result["is_valid"], true);
    assert_eq!(result["url"], "/developer-unit/custom-102");
    assert_eq!(result["kind"], "unit");
    assert_eq!(result["source"], "api");
    assert_eq!(result["strategy"]["type"], "primary_first");
    assert_eq!(result["strategy"]["kind"], "unit");
}

#[tokio::test]
async fn test_resolve_listing_builds_slug() {
    let addr = start_stack().await;

    let result = rpc_call(addr, "resolve_reference", json!({"reference": "203456"})).await;

    assert_eq!(result["is_valid"], true);
    assert_eq!(result["url"], "/listings/house-for-sale-at-east-legon-203456");
    assert_eq!(result["kind"], "property");
}

#[tokio::test]
async fn test_camel_case_params() {
    let addr = start_stack().await;

    let result = rpc_call(
        addr,
        "resolve_reference",
        json!({"reference": "203456", "preferredKind": "unit", "timeoutMs": 5000}),
    )
    .await;

    // Unit lookup misses, the listing is found second.
    assert_eq!(result["is_valid"], true);
    assert_eq!(result["kind"], "property");
    assert_eq!(result["strategy"]["kind"], "unit");
}

#[tokio::test]
async fn test_invalid_reference_is_a_result_not_an_error() {
    let addr = start_stack().await;

    let result = rpc_call(addr, "resolve_reference", json!({"reference": "!!!"})).await;

    assert_eq!(result["is_valid"], false);
    assert_eq!(result["url"], "");
    assert_eq!(result["error_category"], "invalid_format");
}

#[tokio::test]
async fn test_unknown_reference_not_found() {
    let addr = start_stack().await;

    let result = rpc_call(addr, "resolve_reference", json!({"reference": "999999"})).await;

    assert_eq!(result["is_valid"], false);
    assert_eq!(result["error_category"], "not_found");
    assert!(result["error_message"].as_str().unwrap().contains("999999"));
}

#[tokio::test]
async fn test_unavailable_service_reports_error() {
    let addr = start_stack().await;

    let result = rpc_call(addr, "resolve_reference", json!({"reference": "U500"})).await;

    assert_eq!(result["is_valid"], false);
    assert_eq!(result["url"], "");
    assert_eq!(result["error_category"], "network_error");
    assert!(result["suggestion"].is_string());
}

#[tokio::test]
async fn test_slow_service_falls_back_at_timeout() {
    let addr = start_stack().await;

    let result = rpc_call(
        addr,
        "resolve_reference",
        json!({"reference": "U700", "timeoutMs": 300}),
    )
    .await;

    assert_eq!(result["is_valid"], true);
    assert_eq!(result["source"], "fallback");
    assert_eq!(result["error_category"], "timeout");
    assert_eq!(
        result["url"],
        "/developer-unit/multi-bedroom-property-for-rent-or-sale-in-accra-ghana-unit-700"
    );
}

#[tokio::test]
async fn test_quick_resolve_without_verification() {
    let addr = start_stack().await;

    let result = rpc_call(
        addr,
        "quick_resolve",
        json!({"reference": "UNIT102", "verify": false}),
    )
    .await;

    assert_eq!(result["is_valid"], true);
    assert_eq!(result["source"], "fallback");
    assert!(result["suggestion"].is_string());

    let stats = rpc_call(addr, "cache_stats", json!({})).await;
    assert_eq!(stats["entries"], 0);
    assert_eq!(stats["misses"], 0);
}

#[tokio::test]
async fn test_cache_management() {
    let addr = start_stack().await;

    rpc_call(addr, "resolve_reference", json!({"reference": "UNIT102"})).await;
    rpc_call(addr, "resolve_reference", json!({"reference": "UNIT102"})).await;

    let stats = rpc_call(addr, "cache_stats", json!({})).await;
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["hits"], 1);

    let invalidated = rpc_call(addr, "invalidate_reference", json!({"reference": "unit102"})).await;
    assert_eq!(invalidated["removed"], 1);

    rpc_call(addr, "resolve_reference", json!({"reference": "203456"})).await;
    let cleared = rpc_call(addr, "clear_cache", json!({})).await;
    assert_eq!(cleared["success"], true);

    let stats = rpc_call(addr, "cache_stats", json!({})).await;
    assert_eq!(stats["entries"], 0);
}

#[tokio::test]
async fn test_rpc_errors() {
    let addr = start_stack().await;

    let missing = rpc_call_raw(addr, "resolve_reference", json!({})).await;
    assert_eq!(missing["error"]["code"], -32005);

    let invalid = rpc_call_raw(addr, "invalidate_reference", json!({"reference": "!!!"})).await;
    assert_eq!(invalid["error"]["code"], -32005);

    let unknown = rpc_call_raw(addr, "no_such_method", json!({})).await;
    assert_eq!(unknown["error"]["code"], -32603);
    assert_eq!(unknown["id"], 1);
}
