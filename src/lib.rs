//! Equipment reservation forecast server
//!
//! Serves a seasonal ARIMA forecast of monthly reservations for a piece of
//! equipment, computed from its reservation history in PostgreSQL.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod forecast;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
