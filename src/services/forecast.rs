//! Forecast service: loads reservation history and runs the model off the async runtime

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    error::{AppError, AppResult},
    forecast::{self, ForecastConfig},
    models::reservation::ForecastPoint,
    repository::ReservationStore,
};

#[derive(Clone)]
pub struct ForecastService {
    store: Arc<dyn ReservationStore>,
    config: Arc<ForecastConfig>,
    fit_timeout: Duration,
}

impl ForecastService {
    pub fn new(store: Arc<dyn ReservationStore>, config: ForecastConfig, fit_timeout: Duration) -> Self {
        Self {
            store,
            config: Arc::new(config),
            fit_timeout,
        }
    }

    /// Forecast monthly reservations for one equipment.
    ///
    /// Returns `AppError::NoData` without fitting anything when the equipment
    /// has no reservation history.
    pub async fn forecast_equipment(&self, equipment_id: &str) -> AppResult<Vec<ForecastPoint>> {
        tracing::info!("Forecast requested for equipment {}", equipment_id);

        let rows = self.store.monthly_counts(equipment_id).await?;
        if rows.is_empty() {
            tracing::info!("No reservation history for equipment {}", equipment_id);
            return Err(AppError::NoData(format!(
                "No reservation data found for equipment {}",
                equipment_id
            )));
        }
        tracing::debug!("Loaded {} monthly rows for equipment {}", rows.len(), equipment_id);

        let config = Arc::clone(&self.config);
        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || {
            forecast::forecast_reservations(&rows, &config)
        });

        let run = match tokio::time::timeout(self.fit_timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(AppError::Internal(format!("forecast task failed: {}", e)));
            }
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "model fitting for equipment {} exceeded {:?}",
                    equipment_id, self.fit_timeout
                )));
            }
        };

        let coefficients = &run.model.coefficients;
        tracing::info!(
            "Fitted model for equipment {} in {:?}: ar={:?} ma={:?} seasonal_ar={:?} seasonal_ma={:?} sigma2={:.4} loglik={:.3} ({} iterations)",
            equipment_id,
            started.elapsed(),
            coefficients.ar,
            coefficients.ma,
            coefficients.seasonal_ar,
            coefficients.seasonal_ma,
            run.model.sigma2,
            run.model.log_likelihood,
            run.model.iterations
        );

        Ok(run.points)
    }

    /// Readiness of the underlying store
    pub async fn ready(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
