//! Recall Server - reference server for HMAC-signed API requests.
//!
//! Every request except the health checks must carry a valid signature. The
//! server answers authenticated requests with a JSON echo of the caller's api
//! key, method and path.
//!
//! # Usage
//!
//! ```text
//! AI_API_KEY=dev-key AI_API_SECRET=dev-secret recall-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `AI_API_KEY` | *(unset)* | Accepted api key |
//! | `AI_API_SECRET` | *(unset)* | Shared secret for that key |
//! | `AI_REQUEST_TOLERANCE_SEC` | `300` | Allowed clock skew |
//! | `AI_NONCE_TTL_SEC` | `600` | Nonce retention |
//! | `AI_RATE_LIMIT_PER_MIN` | *(unset)* | Per-key request budget |
//! | `SKIP_SIGNATURE_VALIDATION` | `false` | Disable verification (development only) |
//! | `NONCE_SWEEP_INTERVAL_SEC` | `60` | Replay-cache sweep period |
//! | `AI_MAX_BODY_BYTES` | `1048576` | Largest accepted request body |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use recall_auth::{RateLimiter, StaticCredentialProvider, Verifier, VerifierConfig};
use recall_auth_http::{AuthHttpConfig, AuthHttpService};
use recall_core::RecallConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::{EchoHandler, HEALTH_PATH, PUBLIC_PATHS};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
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

/// Build the [`AuthHttpConfig`] from the application [`RecallConfig`].
fn build_http_config(config: &RecallConfig) -> AuthHttpConfig {
    let verifier = config.credential().map(|credential| {
        info!(api_key = credential.api_key(), "configured credential from environment");
        Arc::new(Verifier::new(
            Arc::new(StaticCredentialProvider::from(credential)),
            VerifierConfig::from(config),
        ))
    });

    AuthHttpConfig {
        skip_signature_validation: config.skip_signature_validation,
        public_paths: PUBLIC_PATHS.iter().map(|p| (*p).to_owned()).collect(),
        verifier,
        rate_limiter: config
            .rate_limit_per_minute
            .map(|limit| Arc::new(RateLimiter::new(limit))),
        max_body_bytes: config.max_body_bytes,
    }
}

/// Periodically drop expired nonces and finished rate-limit windows.
fn spawn_sweeper(http_config: &AuthHttpConfig, interval_secs: u64) -> Option<JoinHandle<()>> {
    let verifier = http_config.verifier.clone()?;
    let rate_limiter = http_config.rate_limiter.clone();

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let nonces = verifier.sweep_expired();
            let windows = rate_limiter
                .as_ref()
                .map_or(0, |limiter| limiter.sweep(verifier.now()));
            debug!(nonces, windows, "swept expired entries");
        }
    }))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: AuthHttpService<EchoHandler>) -> Result<()> {
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

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the server and requesting the health endpoint.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET {HEALTH_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"ok\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Read the listen address without requiring a complete configuration.
fn gateway_listen_addr() -> String {
    std::env::var("GATEWAY_LISTEN").unwrap_or_else(|_| RecallConfig::default().gateway_listen)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = gateway_listen_addr().replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = RecallConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.log_level)?;

    if config.skip_signature_validation {
        warn!("SKIP_SIGNATURE_VALIDATION is set, requests are not authenticated");
    }

    let http_config = build_http_config(&config);
    let sweeper = spawn_sweeper(&http_config, config.nonce_sweep_interval_secs);
    let service = AuthHttpService::new(Arc::new(EchoHandler), http_config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        tolerance_secs = config.tolerance_secs,
        nonce_retention_secs = config.nonce_retention_secs(),
        rate_limit_per_minute = ?config.rate_limit_per_minute,
        version = VERSION,
        "starting Recall Server",
    );

    let result = serve(listener, service).await;
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    result
}
