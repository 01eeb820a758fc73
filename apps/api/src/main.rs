mod config;
mod db;
mod errors;
mod extract;
mod models;
mod routes;
mod sms;
mod state;
mod store;
mod templates;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::routes::build_router;
use crate::sms::gateway::{build_sms_gateway, GatewaySettings};
use crate::sms::pipeline::reconcile_stale_pending;
use crate::sms::shortener::BitlyShortener;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ReviewPinger API v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app_env);

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize URL shortener
    let shortener = Arc::new(BitlyShortener::new(
        config.bitly_access_token.clone(),
        config.bitly_base_url.clone(),
    ));

    // Initialize SMS gateway (mock unless configured for live sends)
    let sms = build_sms_gateway(GatewaySettings {
        mock_mode: config.sms_mock_mode(),
        api_key: config.simpletexting_api_key.clone(),
        base_url: config.simpletexting_base_url.clone(),
        mock_delay: Duration::from_millis(config.mock_sms_delay_ms),
    });

    // Records left pending by a previous process never got their outcome written
    match reconcile_stale_pending(store.as_ref(), config.stale_pending_age()).await {
        Ok(count) => info!("Startup reconcile: {count} stale pending SMS records"),
        Err(e) => warn!("Startup reconcile failed: {e}"),
    }

    // Build app state
    let state = AppState {
        store,
        shortener,
        sms,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
