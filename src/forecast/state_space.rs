//! State-space form of a zero-mean ARMA process and its Kalman filter.
//!
//! Harvey representation with state dimension `r = max(p, q + 1)`:
//!
//! ```text
//! x[t+1] = T x[t] + R e[t]      T = [ar | I(r-1); 0], R = [1, ma...]'
//! y[t]   = x[t][0]
//! ```
//!
//! The innovation variance is concentrated out of the likelihood, so all
//! covariances here are expressed in units of sigma^2.

use nalgebra::{DMatrix, DVector};

use super::error::ForecastError;

const MAX_DOUBLINGS: usize = 64;
const LYAPUNOV_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct ArmaStateSpace {
    transition: DMatrix<f64>,
    /// R R'
    disturbance: DMatrix<f64>,
}

/// Sufficient statistics of one filtering pass
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// Sum of v[t]^2 / F[t]
    pub weighted_sum_squares: f64,
    /// Sum of ln F[t]
    pub sum_log_variance: f64,
    pub nobs: usize,
    /// One-step-ahead state after the last observation
    pub next_state: DVector<f64>,
}

impl FilterOutput {
    /// Maximum likelihood estimate of the innovation variance
    pub fn sigma2(&self) -> f64 {
        self.weighted_sum_squares / self.nobs as f64
    }

    /// Gaussian log-likelihood with sigma^2 concentrated out
    pub fn concentrated_log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + 1.0 + self.sigma2().ln())
            - 0.5 * self.sum_log_variance
    }
}

impl ArmaStateSpace {
    /// `ar[i]` multiplies y[t-i-1]; `ma[j]` multiplies e[t-j-1]
    pub fn new(ar: &[f64], ma: &[f64]) -> Self {
        let r = ar.len().max(ma.len() + 1);

        let mut transition = DMatrix::zeros(r, r);
        for (i, coeff) in ar.iter().enumerate() {
            transition[(i, 0)] = *coeff;
        }
        for i in 0..r - 1 {
            transition[(i, i + 1)] = 1.0;
        }

        let mut selection = DVector::zeros(r);
        selection[0] = 1.0;
        for (j, coeff) in ma.iter().enumerate() {
            selection[j + 1] = *coeff;
        }
        let disturbance = &selection * selection.transpose();

        Self {
            transition,
            disturbance,
        }
    }

    pub fn dim(&self) -> usize {
        self.transition.nrows()
    }

    /// Unconditional state covariance, the solution of `P = T P T' + R R'`.
    ///
    /// Uses the doubling iteration `P <- P + A P A'`, `A <- A A`, which only
    /// converges when the AR part is stationary.
    pub fn stationary_covariance(&self) -> Result<DMatrix<f64>, ForecastError> {
        let mut power = self.transition.clone();
        let mut cov = self.disturbance.clone();

        for _ in 0..MAX_DOUBLINGS {
            let next = &cov + &power * &cov * power.transpose();
            let delta = (&next - &cov).amax();
            cov = next;
            if !delta.is_finite() || cov.iter().any(|v| !v.is_finite()) {
                return Err(ForecastError::Numerical(
                    "state covariance is not finite".to_string(),
                ));
            }
            if delta <= LYAPUNOV_TOLERANCE * cov.amax().max(1.0) {
                return Ok(cov);
            }
            power = &power * &power;
        }

        Err(ForecastError::Numerical(
            "state covariance did not converge; AR part is not stationary".to_string(),
        ))
    }

    /// Run the Kalman filter over `observations` from the stationary prior
    pub fn filter(&self, observations: &[f64]) -> Result<FilterOutput, ForecastError> {
        let t = &self.transition;
        let t_transposed = t.transpose();
        let mut state = DVector::zeros(self.dim());
        let mut cov = self.stationary_covariance()?;

        let mut weighted_sum_squares = 0.0;
        let mut sum_log_variance = 0.0;

        for &y in observations {
            let variance = cov[(0, 0)];
            if !(variance.is_finite() && variance > 0.0) {
                return Err(ForecastError::Numerical(format!(
                    "prediction variance {} is not positive",
                    variance
                )));
            }
            let innovation = y - state[0];
            let gain = t * cov.column(0) / variance;

            state = t * &state + &gain * innovation;
            cov = t * &cov * &t_transposed + &self.disturbance
                - &gain * gain.transpose() * variance;
            cov = (&cov + cov.transpose()) * 0.5;

            weighted_sum_squares += innovation * innovation / variance;
            sum_log_variance += variance.ln();
        }

        Ok(FilterOutput {
            weighted_sum_squares,
            sum_log_variance,
            nobs: observations.len(),
            next_state: state,
        })
    }

    /// Point forecasts for `steps` periods starting from the one-step-ahead state
    pub fn forecast(&self, next_state: &DVector<f64>, steps: usize) -> Vec<f64> {
        let mut state = next_state.clone();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            out.push(state[0]);
            state = &self.transition * &state;
        }
        out
    }
}
