mod config;
mod sweep;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use scholarify_api::auth::{AppState, AppStateInner};
use scholarify_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scholarify=debug,scholarify_api=debug,scholarify_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {}", e);
            eprintln!("FATAL: {e}");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database and media storage
    let db = Database::open(&config.db_path)?;
    for username in &config.staff_users {
        if !db.set_staff(username, true)? {
            warn!("Staff user {} does not exist yet", username);
        }
    }
    tokio::fs::create_dir_all(&config.media_dir).await?;

    let state: AppState = Arc::new(AppStateInner::new(
        db,
        config.jwt_secret.clone(),
        config.token_ttl_days,
        config.media_dir.clone(),
    ));

    // Background sweep
    tokio::spawn(sweep::run_sweep_loop(state.clone(), config.sweep_interval_secs));

    let app = scholarify_api::build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Scholarify listening on {}", addr);
    info!("Media served from {}", config.media_dir.display());

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
