//! Quantum Lock activation server
//!
//! Binds license keys to machines so one key cannot be used on an unbounded
//! number of hosts.
//!
//! Usage:
//!   qfloor-activation --port 8080 --db activations.db

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use qfloor_activation::{ActivationStore, AppState, build_router};
use qfloor_license::{DEFAULT_ACTIVATION_DAYS, MAX_ACTIVATIONS_PER_LICENSE};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "qfloor-activation")]
#[command(about = "Quantum Lock license activation server")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database
    #[arg(long, default_value = "activations.db")]
    db: PathBuf,

    /// Machines a license may be active on at once
    #[arg(long, default_value_t = MAX_ACTIVATIONS_PER_LICENSE)]
    max_activations: u32,

    /// Lifetime of a new activation in days
    #[arg(long, default_value_t = DEFAULT_ACTIVATION_DAYS as u32)]
    duration_days: u32,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let store = ActivationStore::open(&args.db)
        .with_context(|| format!("failed to open database {:?}", args.db))?;
    let state = Arc::new(AppState {
        store,
        max_activations: args.max_activations,
        duration_days: i64::from(args.duration_days),
    });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        "activation server listening on {} (max {} machines per license, {} day activations)",
        addr, args.max_activations, args.duration_days
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}
