//! sonde-agentd: probe-based JSON metrics exporter.
//!
//! On `GET /probe?module=<m>&target=<url>` the daemon retrieves a JSON
//! document from the target, evaluates the module's metric definitions
//! against it and responds with the synthesized series in Prometheus text
//! format. `GET /metrics` exposes the exporter's own process metrics.

mod body;
mod fetch;
mod http;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use sonde_observe::{LogConfig, LogFormat, log_init};
use sonde_prometheus::ProbeRegistry;

use crate::fetch::HttpFetcher;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "sonde-agentd", about = "Probe-based JSON metrics exporter")]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9999")]
    addr: SocketAddr,

    /// Config file path (.yaml, .yml or .json).
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Expand environment variables in the config file.
    #[arg(long)]
    expand_env: bool,

    /// Log level (an EnvFilter directive, e.g. `info` or `sonde_core=debug`).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: text or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Expose `# TYPE` metadata lines in probe responses.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    expose_metadata: bool,

    /// Allow `file://` probe targets.
    #[arg(long)]
    enable_file_transport: bool,

    /// Per-probe deadline in seconds, covering retrieval and evaluation.
    #[arg(long, default_value_t = 10)]
    probe_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    log_init(&LogConfig {
        format: args.log_format,
        level: args.log_level.clone(),
        ..LogConfig::default()
    })?;

    let config = sonde_model::load_from_file(&args.config, args.expand_env)?;

    #[cfg(target_os = "linux")]
    prometheus::default_registry().register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;

    let state = AppState {
        config: Arc::new(config),
        registry: Arc::new(ProbeRegistry::new(args.expose_metadata)),
        fetcher: Arc::new(HttpFetcher::new(args.enable_file_transport)?),
        probe_timeout: Duration::from_secs(args.probe_timeout),
    };

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "sonde-agentd listening");

    axum::serve(listener, http::build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
