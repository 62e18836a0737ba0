mod auth;
mod config;
mod db;
mod error;
mod http;
mod identity;
mod metadata;
mod models;
mod routes;
mod sites;
mod source;
mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esmeetv=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    // ── Config ───────────────────────────────────────────────────────────────
    let config = Arc::new(config::AppConfig::from_env()?);
    info!("Starting esmeetv, binding to {}", config.bind);

    // ── Database ─────────────────────────────────────────────────────────────
    let db = db::connect(&config).await?;
    db::seed_admin(&db, &config).await?;

    // ── Application state ─────────────────────────────────────────────────────
    let state = AppState::new(db, Arc::clone(&config))?;

    // ── Site registry ─────────────────────────────────────────────────────────
    sites::refresh(&state).await;
    {
        let state = state.clone();
        tokio::spawn(async move {
            let period = tokio::time::Duration::from_secs(3600);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                info!("Refreshing site registry…");
                sites::refresh(&state).await;
            }
        });
    }

    // ── HTTP server ───────────────────────────────────────────────────────────
    let router = routes::build_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, router).await?;

    Ok(())
}
