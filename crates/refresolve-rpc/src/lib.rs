//! Refresolve RPC - JSON-RPC 2.0 front end for reference resolution.
//!
//! Serves `GET /health` and `POST /rpc` over a shared
//! [`ReferenceResolver`](refresolve_core::ReferenceResolver).

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, AppState};
