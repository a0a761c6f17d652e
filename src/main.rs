//! StoryHub server: session and token lifecycle service.
//!
//! Main entry point that wires all crates together and starts the server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use storyhub_api::Infrastructure;
use storyhub_auth::{LogNotifier, NoopIpReputation, SessionCleanup, StaticIpReputation};
use storyhub_cache::CacheManager;
use storyhub_core::config::AppConfig;
use storyhub_core::error::AppError;
use storyhub_core::traits::IpReputation;
use storyhub_database::repositories::{MemorySessionRepository, MemoryUserDirectory};
use storyhub_database::{DatabasePool, SessionRepository, UserDirectory};

#[tokio::main]
async fn main() {
    let env = std::env::var("STORYHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Open the durable store selected by `database.provider`.
async fn open_database(
    config: &AppConfig,
) -> Result<(Arc<dyn SessionRepository>, Arc<dyn UserDirectory>), AppError> {
    match config.database.provider.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory durable store; sessions are lost on restart");
            Ok((
                Arc::new(MemorySessionRepository::new()),
                Arc::new(MemoryUserDirectory::new()),
            ))
        }
        _ => {
            let pool = DatabasePool::connect(&config.database).await?;
            tracing::info!("Running database migrations...");
            storyhub_database::migration::run_migrations(pool.pool()).await?;
            tracing::info!("Database migrations complete");
            Ok((Arc::new(pool.sessions()), Arc::new(pool.users())))
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting StoryHub v{}", env!("CARGO_PKG_VERSION"));

    let (sessions, users) = open_database(&config).await?;

    tracing::info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);

    let pubsub = storyhub_realtime::connect(&config.realtime).await?;

    let static_reputation = StaticIpReputation::from_config(&config.security);
    let ip_reputation: Arc<dyn IpReputation> = if static_reputation.is_empty() {
        Arc::new(NoopIpReputation)
    } else {
        Arc::new(static_reputation)
    };

    let infra = Infrastructure {
        sessions,
        users,
        cache,
        pubsub,
        notifier: Arc::new(LogNotifier),
        ip_reputation,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let retention_hours = config.session.retention_hours;
    let cleanup_interval = Duration::from_secs(config.session.cleanup_interval_minutes.max(1) * 60);

    let state = storyhub_api::build_state(config, infra)?;

    let cleanup_handle = SessionCleanup::new(
        Arc::clone(state.session_manager.store()),
        retention_hours,
    )
    .spawn(cleanup_interval);

    let app = storyhub_api::build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("StoryHub server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    })
    .await
    .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    cleanup_handle.abort();
    tracing::info!("StoryHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
}
