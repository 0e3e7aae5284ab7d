//! KvGate Server - HTTP/JSON gateway for a bucketed document store.
//!
//! Reads and writes JSON documents in the buckets listed in the
//! configuration file, with optional compare-and-swap on writes.
//!
//! # Usage
//!
//! ```text
//! kvgate-server [CONFIG_PATH]
//! ```
//!
//! `CONFIG_PATH` defaults to `./kvgate.json`. The file must exist.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KVGATE_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `KVGATE_STORE_BACKEND` | `memcached` | `memcached` or `memory` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kvgate_core::config::GatewayConfig;
use kvgate_core::handler::KvGateHandler;
use kvgate_core::provider::KvGateProvider;
use kvgate_core::registry::BucketRegistry;
use kvgate_http::service::KvGateHttpService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the configured log level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Pick the configuration path from the command-line arguments.
fn config_path(args: impl IntoIterator<Item = String>) -> PathBuf {
    args.into_iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .map_or_else(|| PathBuf::from(GatewayConfig::DEFAULT_PATH), PathBuf::from)
}

/// Load the configuration file and apply environment overrides.
fn load_config(path: &Path) -> Result<GatewayConfig> {
    GatewayConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?
        .apply_env()
        .context("invalid configuration override")
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: KvGateHttpService<KvGateHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args());
    let config = load_config(&path)?;
    init_tracing(&config.log_level)?;

    info!(
        config = %path.display(),
        backend = %config.store.backend,
        host = %config.store.host,
        port = config.store.port,
        "opening buckets",
    );
    let registry = BucketRegistry::from_config(&config.store)
        .await
        .context("failed to open buckets")?;
    let buckets: Vec<String> = registry.names().into_iter().map(str::to_owned).collect();

    let provider = KvGateProvider::new(Arc::new(registry));
    let handler = KvGateHandler::new(Arc::new(provider));
    let service = KvGateHttpService::new(Arc::new(handler));

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, buckets = ?buckets, version = VERSION, "starting KvGate Server");

    serve(listener, service).await
}
