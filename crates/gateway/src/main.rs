//! Gateway binary: configuration, wiring, and serving

use linkstash_chat::{ChatClient, ChatProvider};
use linkstash_common::{
    auth::{JwtManager, LogMailer, Mailer, OtpStore},
    config::AppConfig,
    metrics,
};
use linkstash_gateway::{create_router, AppState};
use linkstash_scrape::HttpScraper;
use linkstash_store::{DocumentStore, HttpPermaStore, PermaStore};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    let config = Arc::new(config);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting Linkstash gateway v{}", linkstash_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr =
            SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Wire the collaborators
    let remote: Arc<dyn PermaStore> = Arc::new(HttpPermaStore::new(&config)?);
    let scraper = Arc::new(HttpScraper::new(&config.scrape)?);
    let store = Arc::new(DocumentStore::new(scraper, remote.clone()));
    let chat: Arc<dyn ChatProvider> = Arc::new(ChatClient::new(&config.chat)?);

    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or("auth.jwt_secret must be configured")?;
    let jwt = Arc::new(JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs));
    let otp = Arc::new(OtpStore::new(
        config.auth.otp_ttl_secs,
        config.auth.otp_max_attempts,
    ));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    let state = AppState {
        config: config.clone(),
        store,
        remote,
        chat,
        jwt,
        otp,
        mailer,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Signal fan-out: one receiver triggers the graceful drain, the other
    // bounds how long draining may take
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = graceful_rx.changed().await;
    });

    let mut deadline_rx = shutdown_rx;
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = deadline_rx.changed().await;
            tokio::time::sleep(config.shutdown_timeout()).await;
        } => {
            tracing::warn!("Graceful shutdown timed out, aborting in-flight requests");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
