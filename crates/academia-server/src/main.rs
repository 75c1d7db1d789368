mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use academia_api::bootstrap::ensure_developer;
use academia_api::files::Storage;
use academia_api::routes;
use academia_api::state::{AppState, AppStateInner};
use academia_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academia=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)?;
    let expired = db.delete_expired_sessions()?;
    if expired > 0 {
        info!("Dropped {} expired sessions", expired);
    }

    ensure_developer(&db, &config.dev_email, &config.dev_password)?;
    if config.uses_default_dev_password() {
        warn!(
            "Developer account {} uses the default password; set ACADEMIA_DEV_PASSWORD",
            config.dev_email
        );
    }

    let storage = Storage::new(
        config.upload_dir.clone(),
        config.profile_image_dir.clone(),
        config.settings_dir.clone(),
    )
    .await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        registration: config.registration,
        session_days: config.session_days,
    });
    info!("Registration mode: {:?}", config.registration);

    let app = routes::router(state, config.max_upload_bytes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Academia server listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
