use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use inference_gateway::cache::{self, CacheStatus};
use inference_gateway::{AppState, Config, rate_limit, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse cli arguments / environment
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let state = Arc::new(AppState::from_config(&config));

    // fail-open: a dead cache leaves the service up with caching disabled
    let cache_status = state.service.cache().connect().await;
    if cache_status == CacheStatus::Connected {
        let store = Arc::clone(state.service.cache());
        let every = store.ttl().max(Duration::from_secs(1));
        tokio::spawn(cache::janitor(store, every));
    }

    if let Some(limiter) = state.service.limiter() {
        let limiter = Arc::clone(limiter);
        let every = limiter.window().max(Duration::from_secs(1));
        tokio::spawn(rate_limit::sweeper(limiter, every));
    }

    let app = router(Arc::clone(&state));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        %addr,
        "gateway listening"
    );
    tracing::info!(
        cache = ?cache_status,
        ttl_secs = config.cache_ttl,
        "cache configured"
    );
    if config.rate_limit_enabled {
        tracing::info!(
            "rate limit: {} requests per {} seconds",
            config.rate_limit,
            config.rate_window
        );
    } else {
        tracing::info!("rate limiting disabled");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.service.cache().disconnect().await;
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
