//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use refresolve_core::ReferenceResolver;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Requests handled at once; further requests queue.
const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Application state shared across handlers.
pub struct AppState {
    pub resolver: ReferenceResolver,
}

/// Router with every route and layer, without binding a socket.
pub fn build_router(resolver: ReferenceResolver) -> Router {
    let state = Arc::new(AppState { resolver });

    // Hosts embed the resolver from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    resolver: ReferenceResolver,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(resolver);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refresolve_core::ResolverSettings;

    #[tokio::test]
    async fn test_server_starts() {
        let resolver = ReferenceResolver::with_settings(ResolverSettings::default()).unwrap();
        let addr = start_server(resolver, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_rejects_bad_host() {
        let resolver = ReferenceResolver::new().unwrap();
        assert!(start_server(resolver, "not a host", 0).await.is_err());
    }
}
