use std::sync::{Arc, Instant};

use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use dispatch_optimiser::{
    api,
    auth::{self, AuthService},
    config::AppConfig,
    metrics::{self, AppMetrics},
    services::{optimizer_service::RunParams, OptimizerService},
    store::memory::MemoryStore,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(AppConfig::from_env()?);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.logging.level.parse().unwrap_or(tracing::Level::INFO))
        .init();
    info!("configuration loaded");

    info!("starting dispatch optimiser");

    let metrics = Arc::new(AppMetrics::new()?);
    info!("metrics registry initialised");

    let store = Arc::new(MemoryStore::new());

    let auth_service = Arc::new(AuthService::new(
        &config.security.jwt_secret,
        config.security.jwt_expiry_hours,
    ));

    let default_params = RunParams {
        time_limit_seconds: config.optimizer.time_limit_seconds,
        num_workers: config.optimizer.num_workers,
    };
    let optimizer_service = Arc::new(OptimizerService::new(store.clone(), default_params));

    let state = AppState {
        store,
        optimizer_service,
        auth_service,
        metrics: metrics.clone(),
        config: config.clone(),
    };

    let started_at = Instant::now();
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        metrics::metrics_updater(metrics_clone, 15, started_at).await;
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/login", axum::routing::post(auth::login))
        .route("/api/v1/auth/logout", axum::routing::post(auth::logout))
        .route("/api/v1/auth/user", get(auth::get_user_info))
        .nest("/api/v1/scenarios", api::scenarios::routes())
        .nest("/api/v1", api::data::routes())
        .route("/metrics", get(metrics::metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_address = config.server_bind_address();
    info!(%bind_address, "server starting");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "dispatch-optimiser",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
