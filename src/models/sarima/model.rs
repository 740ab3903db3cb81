//! Multiplicative seasonal ARIMA without intercept.

use super::diff::{
    apply_lag_polynomial, differencing_polynomial, lag_polynomial, poly_mul, undifference_next,
};
use crate::core::Forecast;
use crate::error::{ForecastError, Result};
use crate::models::ResidualForecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{invert_symmetric, numerical_hessian, two_sided_z};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

/// Coefficient bound keeping each factor stationary and invertible.
const COEFFICIENT_BOUND: f64 = 0.99;

/// SARIMA(p, d, q)(P, D, Q)\[s\] specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SARIMASpec {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SARIMASpec {
    pub fn new(order: (usize, usize, usize), seasonal_order: (usize, usize, usize, usize)) -> Self {
        let (p, d, q) = order;
        let (seasonal_p, seasonal_d, seasonal_q, period) = seasonal_order;
        Self {
            p,
            d,
            q,
            seasonal_p,
            seasonal_d,
            seasonal_q,
            period,
        }
    }

    /// Number of ARMA coefficients (sigma² excluded).
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Highest lag of the expanded AR polynomial.
    pub fn ar_lag(&self) -> usize {
        self.p + self.seasonal_p * self.period
    }

    /// Observations consumed by differencing.
    pub fn diff_lag(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    fn coefficient_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.num_coefficients());
        names.extend((1..=self.p).map(|i| format!("ar.L{i}")));
        names.extend((1..=self.q).map(|i| format!("ma.L{i}")));
        names.extend((1..=self.seasonal_p).map(|i| format!("ar.S.L{}", i * self.period)));
        names.extend((1..=self.seasonal_q).map(|i| format!("ma.S.L{}", i * self.period)));
        names
    }
}

impl Default for SARIMASpec {
    fn default() -> Self {
        Self::new((1, 0, 1), (1, 1, 1, 7))
    }
}

impl fmt::Display for SARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SARIMA({}, {}, {})x({}, {}, {}, {})",
            self.p, self.d, self.q, self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
        )
    }
}

/// Inference for one estimated coefficient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarimaCoefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    pub p_value: f64,
}

/// Fit diagnostics of a SARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarimaSummary {
    pub spec: SARIMASpec,
    pub nobs: usize,
    /// Observations contributing to the conditional sum of squares.
    pub effective_nobs: usize,
    pub coefficients: Vec<SarimaCoefficient>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl fmt::Display for SarimaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SARIMA Results")?;
        writeln!(f, "{}", "=".repeat(72))?;
        writeln!(f, "Model:            {}", self.spec)?;
        writeln!(f, "No. Observations: {:>10}    Log Likelihood: {:>12.3}", self.nobs, self.log_likelihood)?;
        writeln!(f, "Effective Obs.:   {:>10}    AIC:            {:>12.3}", self.effective_nobs, self.aic)?;
        writeln!(f, "Converged:        {:>10}    BIC:            {:>12.3}", self.converged, self.bic)?;
        writeln!(f, "{}", "-".repeat(72))?;
        writeln!(f, "{:<12}{:>15}{:>15}{:>15}{:>15}", "", "coef", "std err", "z", "P>|z|")?;
        for c in &self.coefficients {
            writeln!(
                f,
                "{:<12}{:>15.4}{:>15.4}{:>15.3}{:>15.3}",
                c.name, c.estimate, c.std_error, c.z_value, c.p_value
            )?;
        }
        writeln!(f, "{:<12}{:>15.4e}", "sigma2", self.sigma2)?;
        write!(f, "{}", "=".repeat(72))
    }
}

/// Expanded model polynomials for one coefficient vector.
struct Polynomials {
    /// `phi(B) Phi(B^s)`, leading 1.
    ar: Vec<f64>,
    /// `theta(B) Theta(B^s)`, leading 1.
    ma: Vec<f64>,
}

impl Polynomials {
    fn new(spec: &SARIMASpec, params: &[f64]) -> Self {
        let (ar, rest) = params.split_at(spec.p);
        let (ma, rest) = rest.split_at(spec.q);
        let (sar, sma) = rest.split_at(spec.seasonal_p);

        Self {
            ar: poly_mul(
                &lag_polynomial(ar, 1, -1.0),
                &lag_polynomial(sar, spec.period, -1.0),
            ),
            ma: poly_mul(
                &lag_polynomial(ma, 1, 1.0),
                &lag_polynomial(sma, spec.period, 1.0),
            ),
        }
    }

    /// One-step prediction of `w[t]` from past values and past errors.
    fn predict_at(&self, w: &[f64], errors: &[f64], t: usize) -> f64 {
        let ar: f64 = self
            .ar
            .iter()
            .enumerate()
            .skip(1)
            .take_while(|(i, _)| *i <= t)
            .map(|(i, c)| -c * w[t - i])
            .sum();
        let ma: f64 = self
            .ma
            .iter()
            .enumerate()
            .skip(1)
            .take_while(|(j, _)| *j <= t)
            .map(|(j, c)| c * errors[t - j])
            .sum();
        ar + ma
    }

    /// Run the ARMA recursion over `w` with zero presample errors.
    ///
    /// Errors before `start` are held at zero (conditional likelihood).
    fn filter(&self, w: &[f64], start: usize) -> (Vec<f64>, Vec<f64>) {
        let mut predictions = vec![0.0; w.len()];
        let mut errors = vec![0.0; w.len()];
        for t in 0..w.len() {
            predictions[t] = self.predict_at(w, &errors, t);
            if t >= start {
                errors[t] = w[t] - predictions[t];
            }
        }
        (predictions, errors)
    }

    fn css(&self, w: &[f64], start: usize) -> f64 {
        let (_, errors) = self.filter(w, start);
        errors[start..].iter().map(|e| e * e).sum()
    }

    /// MA(∞) weights `psi_0..psi_{horizon-1}` of `ma(B) / (ar(B) delta(B))`.
    fn psi_weights(&self, delta: &[f64], horizon: usize) -> Vec<f64> {
        let full_ar = poly_mul(&self.ar, delta);
        let mut psi = vec![0.0; horizon];
        for j in 0..horizon {
            let mut value = if j == 0 {
                1.0
            } else {
                self.ma.get(j).copied().unwrap_or(0.0)
            };
            for i in 1..=j.min(full_ar.len() - 1) {
                value -= full_ar[i] * psi[j - i];
            }
            psi[j] = value;
        }
        psi
    }
}

#[derive(Debug, Clone)]
struct FittedState {
    params: Vec<f64>,
    series: Vec<f64>,
    differenced: Vec<f64>,
    errors: Vec<f64>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    summary: SarimaSummary,
}

/// Seasonal ARIMA residual model.
///
/// Differencing is applied explicitly; the ARMA part is estimated by
/// conditional sum of squares under Nelder-Mead with each coefficient held
/// in (-0.99, 0.99). There is no intercept.
#[derive(Debug, Clone)]
pub struct SARIMA {
    spec: SARIMASpec,
    config: NelderMeadConfig,
    state: Option<FittedState>,
}

impl SARIMA {
    pub fn new(spec: SARIMASpec) -> Self {
        Self {
            spec,
            config: NelderMeadConfig::default()
                .with_max_iter(2000)
                .with_initial_step(0.1),
            state: None,
        }
    }

    /// Override the optimizer settings.
    pub fn with_optimizer(mut self, config: NelderMeadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn spec(&self) -> SARIMASpec {
        self.spec
    }

    /// Estimated coefficients in `[ar, ma, seasonal ar, seasonal ma]` order.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.params.as_slice())
    }

    pub fn sigma2(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.sigma2)
    }

    pub fn fit_summary(&self) -> Option<&SarimaSummary> {
        self.state.as_ref().map(|s| &s.summary)
    }

    /// Minimum training length for the configured orders.
    pub fn min_observations(&self) -> usize {
        self.spec.diff_lag() + self.spec.ar_lag() + self.spec.num_coefficients() + 1
    }

    fn state(&self) -> Result<&FittedState> {
        self.state
            .as_ref()
            .ok_or_else(|| ForecastError::NotLearned("residual model has not been fit".into()))
    }

    fn estimate(&self, w: &[f64], start: usize) -> (Vec<f64>, usize, bool) {
        let k = self.spec.num_coefficients();
        if k == 0 {
            return (vec![], 0, true);
        }

        let bounds = vec![(-COEFFICIENT_BOUND, COEFFICIENT_BOUND); k];
        let spec = self.spec;
        let result = nelder_mead(
            |params| Polynomials::new(&spec, params).css(w, start),
            &vec![0.0; k],
            Some(&bounds),
            self.config.clone(),
        );
        (result.optimal_point, result.iterations, result.converged)
    }

    fn standard_errors(&self, params: &[f64], w: &[f64], start: usize, sigma2: f64) -> Vec<f64> {
        let k = params.len();
        if k == 0 || sigma2.is_nan() || sigma2 <= 0.0 {
            return vec![f64::NAN; k];
        }

        let n_eff = (w.len() - start) as f64;
        let spec = self.spec;
        let neg_loglik = |p: &[f64]| {
            let css = Polynomials::new(&spec, p).css(w, start);
            0.5 * n_eff * (2.0 * std::f64::consts::PI * css / n_eff).ln() + 0.5 * n_eff
        };

        let hessian = numerical_hessian(neg_loglik, params);
        match invert_symmetric(&hessian) {
            Some(cov) => (0..k).map(|i| cov[i][i].max(0.0).sqrt()).collect(),
            None => {
                log::warn!(
                    "{}: information matrix is not positive definite; standard errors unavailable",
                    self.spec
                );
                vec![f64::NAN; k]
            }
        }
    }

    /// Forecast the differenced series and levels `horizon` steps ahead.
    fn extend(&self, state: &FittedState, horizon: usize) -> Vec<f64> {
        let polys = Polynomials::new(&self.spec, &state.params);
        let delta = differencing_polynomial(self.spec.d, self.spec.seasonal_d, self.spec.period);

        let mut w = state.differenced.clone();
        let mut errors = state.errors.clone();
        let mut levels = state.series.clone();
        for _ in 0..horizon {
            let t = w.len();
            let next_w = polys.predict_at(&w, &errors, t);
            w.push(next_w);
            errors.push(0.0);
            let next_y = undifference_next(next_w, &levels, &delta);
            levels.push(next_y);
        }
        levels.split_off(state.series.len())
    }
}

impl Default for SARIMA {
    fn default() -> Self {
        Self::new(SARIMASpec::default())
    }
}

impl ResidualForecaster for SARIMA {
    fn fit(&mut self, series: &[f64]) -> Result<()> {
        let needed = self.min_observations();
        if series.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: series.len(),
            });
        }
        if let Some(bad) = series.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "residual series contains non-finite value {bad}"
            )));
        }

        let spec = self.spec;
        let delta = differencing_polynomial(spec.d, spec.seasonal_d, spec.period);
        let w = apply_lag_polynomial(series, &delta);
        let start = spec.ar_lag();

        log::debug!("Fitting {spec} on {} observations", series.len());
        let (params, iterations, converged) = self.estimate(&w, start);

        let polys = Polynomials::new(&spec, &params);
        let (w_hat, errors) = polys.filter(&w, start);

        let n_eff = w.len() - start;
        let css: f64 = errors[start..].iter().map(|e| e * e).sum();
        let sigma2 = css / n_eff as f64;

        // Levels cannot be predicted until enough history exists to undo differencing.
        let lag = spec.diff_lag();
        let mut fitted = vec![0.0; series.len()];
        for (offset, &wt) in w_hat.iter().enumerate() {
            let t = lag + offset;
            fitted[t] = undifference_next(wt, &series[..t], &delta);
        }
        let residuals: Vec<f64> = series.iter().zip(fitted.iter()).map(|(y, f)| y - f).collect();

        let std_errors = self.standard_errors(&params, &w, start, sigma2);
        let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::ComputationError(e.to_string()))?;
        let coefficients = spec
            .coefficient_names()
            .into_iter()
            .zip(params.iter().zip(std_errors.iter()))
            .map(|(name, (&estimate, &std_error))| {
                let z_value = estimate / std_error;
                let p_value = if z_value.is_nan() {
                    f64::NAN
                } else {
                    2.0 * normal.sf(z_value.abs())
                };
                SarimaCoefficient {
                    name,
                    estimate,
                    std_error,
                    z_value,
                    p_value,
                }
            })
            .collect();

        let nf = n_eff as f64;
        let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let num_params = (spec.num_coefficients() + 1) as f64;
        let summary = SarimaSummary {
            spec,
            nobs: series.len(),
            effective_nobs: n_eff,
            coefficients,
            sigma2,
            log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * num_params,
            bic: -2.0 * log_likelihood + num_params * nf.ln(),
            iterations,
            converged,
        };
        log::debug!("{spec}: coefficients {params:?}, sigma2 {sigma2:.6e}");

        self.state = Some(FittedState {
            params,
            series: series.to_vec(),
            differenced: w,
            errors,
            fitted,
            residuals,
            sigma2,
            summary,
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state()?;
        Ok(Forecast::from_values(self.extend(state, horizon)))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let state = self.state()?;
        let z = two_sided_z(level)?;
        let point = self.extend(state, horizon);

        let polys = Polynomials::new(&self.spec, &state.params);
        let delta = differencing_polynomial(self.spec.d, self.spec.seasonal_d, self.spec.period);
        let psi = polys.psi_weights(&delta, horizon);

        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, &p) in point.iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let half_width = z * (state.sigma2 * cumulative).sqrt();
            lower.push(p - half_width);
            upper.push(p + half_width);
        }

        Forecast::from_values_with_intervals(point, lower, upper, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn summary(&self) -> Option<String> {
        self.fit_summary().map(|s| s.to_string())
    }

    fn name(&self) -> &str {
        "SARIMA"
    }
}
