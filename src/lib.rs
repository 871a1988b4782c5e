//! Dispatch Optimiser: schedules train movements on a shared rail network
//! under operational constraints (§1). The library crate holds the
//! optimiser core plus the ambient service/HTTP/config/auth/metrics shell
//! that exercises it; the `dispatch-optimiser` binary (`src/main.rs`) is a
//! thin bootstrap over [`AppState`].

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod services;
pub mod store;

use auth::AuthService;
use config::AppConfig;
use metrics::AppMetrics;
use services::OptimizerService;
use store::memory::MemoryStore;

/// Shared application state handed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub optimizer_service: Arc<OptimizerService>,
    pub auth_service: Arc<AuthService>,
    pub metrics: Arc<AppMetrics>,
    pub config: Arc<AppConfig>,
}
