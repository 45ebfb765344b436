//! Refresolve RPC Server - JSON-RPC backend for reference resolution.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the refresolve-core
//! library for hosts that cannot link Rust directly.

use anyhow::Result;
use clap::Parser;
use refresolve_core::{ReferenceResolver, ResolverSettings};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "refresolve-rpc")]
#[command(about = "JSON-RPC server for reference resolution")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON settings file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lookup service base URL, overriding the settings file
    #[arg(long)]
    api_base_url: Option<String>,

    /// SQLite database for the session cache tier
    #[arg(long)]
    session_db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --debug when set
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Refresolve RPC Server");

    let mut settings = match &args.config {
        Some(path) => ResolverSettings::from_json_file(path)?,
        None => ResolverSettings::default(),
    };
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }
    info!("Lookup service: {}", settings.api_base_url);

    let mut builder = ReferenceResolver::builder().settings(settings);
    if let Some(path) = &args.session_db {
        info!("Session cache: {}", path.display());
        builder = builder.session_db(path);
    }
    let resolver = builder.build()?;

    let addr = refresolve_rpc::start_server(resolver, &args.host, args.port).await?;

    // Print port for the host process to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
