//! Reusable HTTP server with request logging and optional CORS support.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{build_cors_layer, CorsConfig, HttpLoggingConfig, HttpLoggingLayer};

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Logging middleware configuration.
    pub logging_config: HttpLoggingConfig,
    /// CORS configuration. No CORS layer is installed when absent.
    pub cors_config: Option<CorsConfig>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            logging_config: HttpLoggingConfig::default(),
            cors_config: None,
        }
    }
}

/// Apply the configured middleware to a router.
pub fn with_middleware(config: &HttpServerConfig, router: Router) -> Router {
    let router = match &config.cors_config {
        Some(cors) => router.layer(build_cors_layer(cors)),
        None => router,
    };
    router.layer(HttpLoggingLayer::new(config.logging_config.clone()))
}

/// Serve `router` until `cancellation_token` is cancelled.
pub async fn run_http_server(
    config: HttpServerConfig,
    router: Router,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid server address {}:{}", config.host, config.port))?;

    let app = with_middleware(&config, router);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(address = %addr, "starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            debug!("HTTP server shutdown signal received");
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
