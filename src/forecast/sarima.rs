//! Seasonal ARIMA `(p,d,q)x(P,D,Q,s)` estimated by exact maximum likelihood.
//!
//! The series is differenced with `(1-B)^d (1-B^s)^D`, the remaining zero-mean
//! multiplicative ARMA is put in state-space form and its Gaussian likelihood
//! is maximised over the stationary and invertible region. Forecasts are made
//! on the differenced scale and integrated back.

use nalgebra::DVector;

use super::{error::ForecastError, optimize::NelderMead, state_space::ArmaStateSpace};

/// Model orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SarimaOrder {
    /// Number of estimated ARMA coefficients (sigma^2 excluded)
    pub fn n_coefficients(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Observations consumed by differencing
    pub fn differencing_lag(&self) -> usize {
        self.d + self.period * self.seasonal_d
    }

    /// Smallest series length the model accepts: after differencing there
    /// must be more observations than coefficients.
    pub fn min_observations(&self) -> usize {
        self.differencing_lag() + self.n_coefficients() + 1
    }

    /// Coefficients `c[0..=K]` of `(1-B)^d (1-B^s)^D`, `c[0] = 1`
    fn differencing_polynomial(&self) -> Vec<f64> {
        let mut poly = vec![1.0];
        for _ in 0..self.d {
            poly = poly_mul(&poly, &[1.0, -1.0]);
        }
        let mut seasonal = vec![0.0; self.period + 1];
        seasonal[0] = 1.0;
        seasonal[self.period] = -1.0;
        for _ in 0..self.seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
        poly
    }
}

/// Estimated ARMA coefficients.
///
/// AR terms follow `y[t] = phi * y[t-1] + ...`, MA terms `... + e[t] + theta * e[t-1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SarimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

impl SarimaCoefficients {
    /// Map an unconstrained parameter vector `[ar, ma, seasonal_ar, seasonal_ma]`
    /// onto stationary AR and invertible MA polynomials.
    fn from_unconstrained(order: &SarimaOrder, params: &[f64]) -> Self {
        let (ar, rest) = params.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(order.seasonal_p);

        Self {
            ar: constrain_stationary(ar),
            ma: constrain_stationary(ma).into_iter().map(|c| -c).collect(),
            seasonal_ar: constrain_stationary(seasonal_ar),
            seasonal_ma: constrain_stationary(seasonal_ma)
                .into_iter()
                .map(|c| -c)
                .collect(),
        }
    }

    /// Lag coefficients of `phi(B) Phi(B^s)` in `y[t] = sum a[i] y[t-i-1] + ...` form
    fn expanded_ar(&self, period: usize) -> Vec<f64> {
        let non_seasonal = lag_polynomial(&self.ar, 1, -1.0);
        let seasonal = lag_polynomial(&self.seasonal_ar, period, -1.0);
        poly_mul(&non_seasonal, &seasonal)
            .into_iter()
            .skip(1)
            .map(|c| -c)
            .collect()
    }

    /// Lag coefficients of `theta(B) Theta(B^s)`, constant term dropped
    fn expanded_ma(&self, period: usize) -> Vec<f64> {
        let non_seasonal = lag_polynomial(&self.ma, 1, 1.0);
        let seasonal = lag_polynomial(&self.seasonal_ma, period, 1.0);
        poly_mul(&non_seasonal, &seasonal).into_iter().skip(1).collect()
    }

    fn state_space(&self, period: usize) -> ArmaStateSpace {
        ArmaStateSpace::new(&self.expanded_ar(period), &self.expanded_ma(period))
    }
}

/// Unfitted model: orders plus the optimiser settings used to estimate it
#[derive(Debug, Clone)]
pub struct Sarima {
    order: SarimaOrder,
    solver: NelderMead,
}

/// A model fitted to one series, ready to forecast
#[derive(Debug, Clone)]
pub struct FittedSarima {
    pub order: SarimaOrder,
    pub coefficients: SarimaCoefficients,
    /// Innovation variance
    pub sigma2: f64,
    pub log_likelihood: f64,
    /// Observations left after differencing
    pub nobs: usize,
    pub iterations: usize,
    history: Vec<f64>,
    differencing: Vec<f64>,
    state_space: ArmaStateSpace,
    next_state: DVector<f64>,
}

impl Sarima {
    pub fn new(order: SarimaOrder, solver: NelderMead) -> Self {
        Self { order, solver }
    }

    pub fn order(&self) -> &SarimaOrder {
        &self.order
    }

    pub fn fit(&self, values: &[f64]) -> Result<FittedSarima, ForecastError> {
        let order = self.order;
        let required = order.min_observations();
        if values.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MalformedInput(
                "series contains non-finite values".to_string(),
            ));
        }

        let differencing = order.differencing_polynomial();
        let differenced = difference(values, &differencing);

        let scale = values.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        if differenced.iter().all(|w| w.abs() <= 1e-9 * scale) {
            return Err(ForecastError::DegenerateSeries);
        }

        let objective = |params: &[f64]| {
            let coefficients = SarimaCoefficients::from_unconstrained(&order, params);
            match coefficients.state_space(order.period).filter(&differenced) {
                Ok(out) if out.sigma2() > 0.0 => -out.concentrated_log_likelihood(),
                _ => f64::INFINITY,
            }
        };

        let start = vec![0.0; order.n_coefficients()];
        let minimum = self.solver.minimize(objective, &start);

        if !minimum.value.is_finite() {
            return Err(ForecastError::Numerical(
                "likelihood is not finite at any evaluated parameter".to_string(),
            ));
        }
        if !minimum.converged {
            return Err(ForecastError::NotConverged {
                iterations: minimum.iterations,
            });
        }

        let coefficients = SarimaCoefficients::from_unconstrained(&order, &minimum.point);
        let state_space = coefficients.state_space(order.period);
        let out = state_space.filter(&differenced)?;

        Ok(FittedSarima {
            order,
            coefficients,
            sigma2: out.sigma2(),
            log_likelihood: out.concentrated_log_likelihood(),
            nobs: out.nobs,
            iterations: minimum.iterations,
            history: values.to_vec(),
            differencing,
            state_space,
            next_state: out.next_state,
        })
    }
}

impl FittedSarima {
    /// Point forecasts on the original scale for the `steps` periods after the series
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        let differenced = self.state_space.forecast(&self.next_state, steps);
        let values = integrate(&self.history, &differenced, &self.differencing);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Numerical(
                "forecast produced non-finite values".to_string(),
            ));
        }
        Ok(values)
    }
}

/// `w[t] = sum_k c[k] y[t-k]` for every t with a full window
fn difference(values: &[f64], poly: &[f64]) -> Vec<f64> {
    let lag = poly.len() - 1;
    (lag..values.len())
        .map(|t| poly.iter().enumerate().map(|(k, c)| c * values[t - k]).sum::<f64>())
        .collect()
}

/// Inverse of [`difference`]: extend `history` with values whose differences are `differenced`
fn integrate(history: &[f64], differenced: &[f64], poly: &[f64]) -> Vec<f64> {
    let mut extended = history.to_vec();
    for &w in differenced {
        let t = extended.len();
        let y = poly
            .iter()
            .enumerate()
            .skip(1)
            .fold(w, |acc, (k, c)| acc - c * extended[t - k]);
        extended.push(y);
    }
    extended.split_off(history.len())
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `1 + sign * sum coeffs[k] B^(spacing * (k+1))`
fn lag_polynomial(coeffs: &[f64], spacing: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coeffs.len() * spacing + 1];
    poly[0] = 1.0;
    for (k, c) in coeffs.iter().enumerate() {
        poly[(k + 1) * spacing] = sign * c;
    }
    poly
}

/// Map reals onto the coefficients of a stationary AR polynomial.
///
/// Each value is squashed into (-1, 1) and used as a partial autocorrelation;
/// the Durbin-Levinson recursion turns those into AR coefficients.
fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for (k, x) in unconstrained.iter().enumerate() {
        let pacf = x / x.hypot(1.0);
        let previous = phi.clone();
        for j in 0..k {
            phi[j] = previous[j] - pacf * previous[k - 1 - j];
        }
        phi.push(pacf);
    }
    phi
}
