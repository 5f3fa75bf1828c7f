//! CoinVault Server Binary

use std::net::SocketAddr;
use std::sync::Arc;

use coinvault_engine::{MemoryStore, WalletService};
use coinvault_server::{seed, AppState, RateLimiter, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    if let Some(url) = &config.database_url {
        // The in-memory store ignores it; logged so operators wiring a
        // persistent backend can see what was picked up.
        tracing::info!(database_url = %url, "database url configured");
    }

    let store = Arc::new(MemoryStore::new());
    let wallet = Arc::new(WalletService::with_config(store, config.engine_config()));

    if config.seed_demo_data {
        seed::seed_demo_data(&wallet).await?;
    }

    let limiter = Arc::new(RateLimiter::new(config.rate_limit_max, config.rate_limit_window));
    let app = coinvault_server::router(AppState::new(wallet, limiter));

    let addr = SocketAddr::new(config.bind_address, config.port);
    tracing::info!("coinvault listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down gracefully");
}
