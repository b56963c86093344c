//! Business logic services

pub mod forecast;

use std::sync::Arc;
use std::time::Duration;

use crate::{forecast::ForecastConfig, repository::ReservationStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub forecast: forecast::ForecastService,
}

impl Services {
    /// Create all services on top of the given reservation store
    pub fn new(
        store: Arc<dyn ReservationStore>,
        forecast_config: ForecastConfig,
        fit_timeout: Duration,
    ) -> Self {
        Self {
            forecast: forecast::ForecastService::new(store, forecast_config, fit_timeout),
        }
    }
}
