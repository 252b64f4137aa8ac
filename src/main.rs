// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

use callwire::config;
use callwire::engine;
use callwire::server;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "callwire", about = "Streaming tool-call dispatcher for chat UIs")]
struct Cli {
    /// Path to the callwire.yaml config file
    #[arg(long, default_value = "callwire.yaml", env = "CALLWIRE_CONFIG")]
    config: String,

    /// Port to listen on
    #[arg(long, default_value_t = 9810, env = "CALLWIRE_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "CALLWIRE_HOST")]
    host: IpAddr,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!(%addr, "callwire starting");

    let source = config::FileSource::new(&cli.config);
    let config = match config::load_config(&source) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = %config.version,
        environment = %config.environment,
        model = %config.provider.model,
        establish_timeout_ms = config.engine.establish_timeout.as_millis() as u64,
        idle_timeout_ms = config.engine.idle_timeout.map_or(0, |d| d.as_millis() as u64),
        config_hash = %config.config_hash,
        "config loaded"
    );

    let engine = match engine::build_engine(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("failed to build engine: {e}");
            std::process::exit(1);
        }
    };

    // Expired sessions are also dropped lazily on lookup; this bounds memory.
    let sweeper = engine.clone();
    let ttl = config.sessions.ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl.min(Duration::from_secs(300)));
        loop {
            interval.tick().await;
            sweeper.sessions().cleanup(ttl);
        }
    });

    let app = server::build_router(engine);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");

    tracing::info!(%addr, "callwire listening");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
