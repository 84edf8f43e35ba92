use anyhow::{Context, Result};
use axum::Router;
use cnft_das_gateway::config::ApiConfig;
use cnft_das_gateway::credentials::CredentialSources;
use cnft_das_gateway::http;
use cnft_das_gateway::state::AppState;
use cnft_das_gateway::upstream::UpstreamClient;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ApiConfig::load().context("Failed to load configuration")?;

    let credentials = CredentialSources::from_env();
    if !credentials.server_configured() {
        warn!("Helius API key not configured; proxy requests will fail until it is set");
    }

    let upstream_url = config
        .helius
        .upstream_url()
        .context("Invalid Helius upstream URL")?;
    info!(
        network = ?config.helius.network,
        host = upstream_url.host_str().unwrap_or_default(),
        "Forwarding DAS requests upstream"
    );
    let upstream = UpstreamClient::new(upstream_url, config.helius.request_timeout())
        .context("Failed to initialize upstream client")?;

    let app_state = AppState::new(credentials, upstream);

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("DAS gateway listening on {local_addr}");

    let router: Router = http::router(app_state);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;

    Ok(())
}

fn init_tracing() {
    let default_filter = "info,tower_http=debug";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false);
    if std::env::var("DAS_GATEWAY_LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}
