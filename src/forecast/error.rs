//! Forecast engine errors

use thiserror::Error;

/// Failure modes of a single forecast computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Need at least {required} monthly observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Differenced series has zero variance; the model cannot be estimated")]
    DegenerateSeries,

    #[error("Parameter search did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ForecastError {
    /// Short machine-friendly label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InsufficientData { .. } => "insufficient_data",
            ForecastError::DegenerateSeries => "degenerate_series",
            ForecastError::NotConverged { .. } => "not_converged",
            ForecastError::Numerical(_) => "numerical",
            ForecastError::MalformedInput(_) => "malformed_input",
            ForecastError::InvalidConfig(_) => "invalid_config",
        }
    }
}
