pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use gateway::Gateway;
use services::dashboard::DashboardSequencer;

/// Shared application state passed to all Axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub config: config::AppConfig,
    pub dashboards: Arc<DashboardSequencer>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, config: config::AppConfig) -> Self {
        Self {
            gateway,
            config,
            dashboards: Arc::new(DashboardSequencer::new()),
        }
    }
}
