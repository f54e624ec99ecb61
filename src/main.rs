use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use leadgate::config::Args;
use leadgate::rate_limit::{InMemoryRateLimiter, RateLimitStore, sweeper};
use leadgate::state::AppState;
use leadgate::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = SqliteStore::open(&args.database)?;
    let rate_limiter: Arc<dyn RateLimitStore> = Arc::new(InMemoryRateLimiter::new());

    // spawn the background sweeper
    if let Some(every) = args.sweep_every() {
        tokio::spawn(sweeper(Arc::clone(&rate_limiter), every));
    }

    if !args.guide_path.exists() {
        warn!(path = %args.guide_path.display(), "guide file not found, downloads will return 404");
    }

    // creating shared state
    let state = Arc::new(AppState {
        store: Arc::new(store),
        rate_limiter,
        form_limit: args.form_limit(),
        download_limit: args.download_limit(),
        guide_path: args.guide_path.clone(),
        public_dir: args.public_dir.clone(),
    });

    let app = leadgate::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("leadgate running on http://localhost:{}", args.port);
    info!(database = %args.database, public_dir = %args.public_dir.display(), "storage");
    info!(
        "Rate limit: forms {} req / {}s, downloads {} req / {}s",
        args.form_rate_limit,
        args.form_rate_window,
        args.download_rate_limit,
        args.download_rate_window
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("leadgate stopped");
    Ok(())
}

// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
