mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use placement_api::AppStateInner;
use placement_db::Database;
use placement_engine::notifier::{LogNotifier, NotificationQueue};
use placement_engine::reconciler::run_reconciler;
use placement_engine::storage::LocalObjectStore;

use crate::config::Config;

/// Pending reset-code notifications held before new ones are dropped.
const NOTIFICATION_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "placement=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {}", e);
            eprintln!("FATAL: {e}. Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    db.ping()?;
    if let Some(admin) = &config.bootstrap_admin {
        placement_api::auth::seed_admin(&db, &admin.email, &admin.password)?;
    }
    let store = LocalObjectStore::new(config.upload_dir.clone(), config.public_url.clone()).await?;

    let shutdown = CancellationToken::new();
    let (notifications, notifier_worker) = NotificationQueue::start(
        Arc::new(LogNotifier),
        NOTIFICATION_QUEUE_CAPACITY,
        shutdown.clone(),
    );

    let reconciler = tokio::spawn(run_reconciler(
        db.clone(),
        config.reconcile_interval,
        config.sweep_timeout,
        shutdown.clone(),
    ));

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: config.token_ttl,
        reset_code_ttl: config.otp_ttl,
        store: Arc::new(store),
        notifications,
    });

    let app = placement_api::router(state)
        .nest_service("/files", ServeDir::new(&config.upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Placement server listening on {}", addr);
    info!(
        "Reconciler every {}s, sweep timeout {}s",
        config.reconcile_interval.as_secs(),
        config.sweep_timeout.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    for (name, task) in [("reconciler", reconciler), ("notifier", notifier_worker)] {
        if let Err(e) = task.await {
            warn!("{} task ended abnormally: {}", name, e);
        }
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
