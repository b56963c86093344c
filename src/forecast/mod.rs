//! Reservation forecast engine
//!
//! Turns the monthly reservation counts of one piece of equipment into a
//! seasonal ARIMA forecast for the following months.

pub mod calendar;
pub mod error;
pub mod optimize;
pub mod sarima;
pub mod state_space;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::reservation::{ForecastPoint, ReservationCount};

pub use calendar::{GapPolicy, MonthlySeries, YearMonth};
pub use error::ForecastError;
pub use sarima::{FittedSarima, Sarima, SarimaOrder};

use optimize::NelderMead;

/// Non-seasonal (p, d, q)
pub const NON_SEASONAL_ORDER: (usize, usize, usize) = (1, 1, 1);
/// Seasonal (P, D, Q)
pub const SEASONAL_ORDER: (usize, usize, usize) = (1, 1, 1);
/// Months per seasonal cycle
pub const SEASONAL_PERIOD: usize = 12;
/// Months forecast per request
pub const HORIZON: usize = 6;

const MAX_ORDER: usize = 3;

/// Model and estimation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub non_seasonal_order: (usize, usize, usize),
    pub seasonal_order: (usize, usize, usize),
    pub seasonal_period: usize,
    pub horizon: usize,
    pub gap_policy: GapPolicy,
    /// Simplex iterations allowed before the fit is reported as not converged
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Upper bound on one model fit, in seconds
    pub fit_timeout_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            non_seasonal_order: NON_SEASONAL_ORDER,
            seasonal_order: SEASONAL_ORDER,
            seasonal_period: SEASONAL_PERIOD,
            horizon: HORIZON,
            gap_policy: GapPolicy::AsObserved,
            max_iterations: 2000,
            tolerance: 1e-10,
            fit_timeout_secs: 30,
        }
    }
}

impl ForecastConfig {
    pub fn order(&self) -> SarimaOrder {
        let (p, d, q) = self.non_seasonal_order;
        let (seasonal_p, seasonal_d, seasonal_q) = self.seasonal_order;
        SarimaOrder {
            p,
            d,
            q,
            seasonal_p,
            seasonal_d,
            seasonal_q,
            period: self.seasonal_period,
        }
    }

    pub fn fit_timeout(&self) -> Duration {
        Duration::from_secs(self.fit_timeout_secs)
    }

    fn solver(&self) -> NelderMead {
        NelderMead {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            ..NelderMead::default()
        }
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        let order = self.order();
        let orders = [
            order.p,
            order.d,
            order.q,
            order.seasonal_p,
            order.seasonal_d,
            order.seasonal_q,
        ];
        if orders.iter().any(|o| *o > MAX_ORDER) {
            return Err(ForecastError::InvalidConfig(format!(
                "model orders must be at most {}",
                MAX_ORDER
            )));
        }
        if self.seasonal_period < 2 {
            return Err(ForecastError::InvalidConfig(
                "seasonal_period must be at least 2".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidConfig(
                "horizon must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 || self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(ForecastError::InvalidConfig(
                "max_iterations must be positive and tolerance non-negative".to_string(),
            ));
        }
        if self.fit_timeout_secs == 0 {
            return Err(ForecastError::InvalidConfig(
                "fit_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of one forecast computation
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub points: Vec<ForecastPoint>,
    pub model: FittedSarima,
    /// Unrounded model estimates, aligned with `points`
    pub estimates: Vec<f64>,
}

/// Fit the configured model to `rows` and forecast `config.horizon` months
/// past the last observed month.
pub fn forecast_reservations(
    rows: &[ReservationCount],
    config: &ForecastConfig,
) -> Result<ForecastRun, ForecastError> {
    config.validate()?;
    let series = MonthlySeries::from_rows(rows, config.gap_policy)?;
    let order = config.order();

    let last = series.last_month().ok_or(ForecastError::InsufficientData {
        required: order.min_observations(),
        actual: 0,
    })?;

    let model = Sarima::new(order, config.solver()).fit(series.values())?;
    let estimates = model.forecast(config.horizon)?;

    let points = estimates
        .iter()
        .enumerate()
        .map(|(i, estimate)| {
            let month = last.offset(i as i64 + 1);
            ForecastPoint {
                year: month.year,
                month: month.month as i32,
                count: estimate.round() as i64,
            }
        })
        .collect();

    Ok(ForecastRun {
        points,
        model,
        estimates,
    })
}
