use akathon::core::config::Config;
use akathon::core::routes::build_router;
use akathon::core::state::AppState;
use akathon::core::tracing_init::init_tracing;
use anyhow::{Context, Result};
use axum::serve;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Explicit path, else ./config.toml when present, else built-in defaults
    let config_path = match args.get(1) {
        Some(path) => Some(PathBuf::from(path)),
        None => Some(PathBuf::from("config.toml")).filter(|path| path.exists()),
    };

    // Environment is read exactly once, here
    let config = Config::load(config_path.as_deref(), |key| env::var(key).ok())
        .context(format!(
            "Failed to load configuration{}",
            config_path
                .as_ref()
                .map(|p| format!(" from '{}'", p.display()))
                .unwrap_or_default()
        ))?;

    init_tracing(&config.logging);
    config.log_warnings();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: Option<PathBuf>) -> Result<()> {
    info!(
        config_path = ?config_path,
        port = config.server.port,
        num_threads = config.server.num_threads,
        database = %config.database.path.display(),
        max_per_cohort = config.registration.max_per_cohort,
        log_level = %config.logging.level,
        "Akathon registration portal starting"
    );

    let state = AppState::new(config.clone());

    state
        .store
        .init_schema()
        .context(format!(
            "Failed to initialize database at {}",
            config.database.path.display()
        ))?;

    info!(database = %config.database.path.display(), "Database schema ready");

    let app = build_router(Arc::new(state)).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind TCP listener to {}", addr))?;

    info!(address = %addr, "Listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Shut down gracefully");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
