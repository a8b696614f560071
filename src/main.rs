mod api;
mod config;
mod error;
mod models;
mod services;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{Pacer, PgUserStore, SpotifySessions, SyncScheduler, SyncService};
use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,new_releases_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    // Initialize services
    let users = Arc::new(PgUserStore::new(db.clone()));
    let sessions = Arc::new(SpotifySessions::new(config.spotify_api_base.clone()));
    // one pacer for every sync in the process
    let pacer = Arc::new(Pacer::new(config.sync.call_interval));
    let sync = Arc::new(SyncService::new(
        users.clone(),
        sessions.clone(),
        pacer.clone(),
        config.sync.clone(),
    ));
    tracing::info!(
        "Sync engine ready: window {} days, {:?} between catalog calls",
        config.sync.window_days,
        pacer.interval()
    );

    let scheduler = SyncScheduler::new(
        sync.clone(),
        users.clone(),
        config.sync_interval,
        config.sync_concurrency,
    );
    tokio::spawn(scheduler.run());
    tracing::info!(
        "Scheduled sync every {:?} ({} concurrent)",
        config.sync_interval,
        config.sync_concurrency
    );

    let app_state = Arc::new(AppState {
        users,
        sessions,
        sync,
        admin_token: config.admin_token.clone(),
    });

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    // Build router
    let app = api::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors.allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
