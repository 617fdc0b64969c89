//! Passgate Server - HTTP API for WebAuthn assertion verification
//!
//! Exposes passgate-core over HTTP:
//! - POST /credential - Register a public key for an identity
//! - POST /session - Issue a challenge for a registered identity
//! - POST /verify - Verify a signed assertion

use std::net::SocketAddr;
use std::time::Duration;

use passgate_server::{create_router_with_state, AppState, Config};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("passgate_server=info,passgate_core=info")),
        )
        .init();

    let config = Config::from_env();
    let state = AppState::from_config(&config);

    if config.compat_mode {
        tracing::warn!("Compatibility mode: UP flag not checked, sessions reusable until expiry");
    }
    match &config.rp_id {
        Some(rp_id) => tracing::info!(rp_id = %rp_id, "Using fixed relying party id"),
        None => tracing::info!("Relying party id taken from request Host header"),
    }

    spawn_cleanup(&state, Duration::from_secs(config.cleanup_interval_secs.max(1)));

    let app = create_router_with_state(&config, state);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Passgate listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop expired credentials and sessions
fn spawn_cleanup(state: &AppState, every: Duration) {
    let relying_party = state.relying_party.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = relying_party.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Purged expired store entries");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
