//! Ordinary Least Squares regression with a diagnostic summary.
//!
//! Used to fit the linear trend of the Box-Cox transformed rolling average.

use crate::error::{ForecastError, Result};
use crate::utils::stats::invert_symmetric;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use std::fmt;

/// Inference for one fitted coefficient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientStat {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    /// Two-sided p-value against zero.
    pub p_value: f64,
}

/// Regression diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OlsSummary {
    /// Intercept first, then regressors in fit order.
    pub coefficients: Vec<CoefficientStat>,
    pub nobs: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl fmt::Display for OlsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OLS Regression Results")?;
        writeln!(f, "{}", "=".repeat(72))?;
        writeln!(f, "No. Observations: {:>10}    R-squared:      {:>12.4}", self.nobs, self.r_squared)?;
        writeln!(f, "Df Residuals:     {:>10}    Adj. R-squared: {:>12.4}", self.df_resid, self.adj_r_squared)?;
        writeln!(f, "F-statistic:      {:>10.4e}    Prob (F):       {:>12.4e}", self.f_statistic, self.f_p_value)?;
        writeln!(f, "Log-Likelihood:   {:>10.3}    AIC:            {:>12.3}", self.log_likelihood, self.aic)?;
        writeln!(f, "{:>28}    BIC:            {:>12.3}", "", self.bic)?;
        writeln!(f, "{}", "-".repeat(72))?;
        writeln!(f, "{:<12}{:>15}{:>15}{:>15}{:>15}", "", "coef", "std err", "t", "P>|t|")?;
        for c in &self.coefficients {
            writeln!(
                f,
                "{:<12}{:>15.6e}{:>15.6e}{:>15.4}{:>15.4}",
                c.name, c.estimate, c.std_error, c.t_value, c.p_value
            )?;
        }
        write!(f, "{}", "=".repeat(72))
    }
}

/// OLS regression coefficients and intercept.
#[derive(Debug, Clone)]
pub struct OLSResult {
    /// Regression coefficients (one per regressor).
    pub coefficients: Vec<f64>,
    /// Intercept term.
    pub intercept: f64,
    /// Names of regressors in order.
    pub regressor_names: Vec<String>,
    pub summary: OlsSummary,
}

impl OLSResult {
    /// Predict from one row of regressor values.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: row.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.iter())
                .map(|(b, x)| b * x)
                .sum::<f64>())
    }
}

/// Fit `y = intercept + sum_i coef_i * x_i` by solving the normal equations.
///
/// `regressors` are `(name, values)` pairs, each as long as `y`.
pub fn ols_fit(y: &[f64], regressors: &[(&str, &[f64])]) -> Result<OLSResult> {
    let n = y.len();
    let k = regressors.len();
    let p = k + 1;

    if n <= p {
        return Err(ForecastError::InsufficientData {
            needed: p + 1,
            got: n,
        });
    }
    for (_, values) in regressors {
        if values.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: values.len(),
            });
        }
    }

    let row = |obs: usize| -> Vec<f64> {
        std::iter::once(1.0)
            .chain(regressors.iter().map(|(_, values)| values[obs]))
            .collect()
    };

    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for (obs, &y_obs) in y.iter().enumerate() {
        let x = row(obs);
        for i in 0..p {
            xty[i] += x[i] * y_obs;
            for j in 0..p {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }

    let xtx_inv = invert_symmetric(&xtx).ok_or_else(|| {
        ForecastError::ComputationError(
            "OLS regression failed: design matrix is singular".to_string(),
        )
    })?;
    let beta: Vec<f64> = xtx_inv
        .iter()
        .map(|r| r.iter().zip(xty.iter()).map(|(a, b)| a * b).sum())
        .collect();

    let fitted = |obs: usize| -> f64 { row(obs).iter().zip(beta.iter()).map(|(x, b)| x * b).sum() };
    let ssr: f64 = y
        .iter()
        .enumerate()
        .map(|(obs, &y_obs)| (y_obs - fitted(obs)).powi(2))
        .sum();
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();

    let df_resid = n - p;
    let sigma2 = ssr / df_resid as f64;

    let names = std::iter::once("const").chain(regressors.iter().map(|(name, _)| *name));
    let coefficients: Vec<CoefficientStat> = names
        .zip(beta.iter())
        .enumerate()
        .map(|(i, (name, &estimate))| {
            let std_error = (sigma2 * xtx_inv[i][i]).sqrt();
            let t_value = estimate / std_error;
            CoefficientStat {
                name: name.to_string(),
                estimate,
                std_error,
                t_value,
                p_value: students_t_two_sided(t_value, df_resid as f64),
            }
        })
        .collect();

    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;
    let f_statistic = ((sst - ssr) / k as f64) / sigma2;
    let f_p_value = fisher_upper_tail(f_statistic, k as f64, df_resid as f64);

    let nf = n as f64;
    let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * p as f64;
    let bic = -2.0 * log_likelihood + p as f64 * nf.ln();

    Ok(OLSResult {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
        regressor_names: regressors.iter().map(|(name, _)| name.to_string()).collect(),
        summary: OlsSummary {
            coefficients,
            nobs: n,
            df_resid,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
            log_likelihood,
            aic,
            bic,
        },
    })
}

fn students_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.sf(t.abs()),
        Err(_) => f64::NAN,
    }
}

fn fisher_upper_tail(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() || d1 <= 0.0 {
        return f64::NAN;
    }
    if f.is_infinite() {
        return 0.0;
    }
    match FisherSnedecor::new(d1, d2) {
        Ok(dist) => dist.sf(f.max(0.0)),
        Err(_) => f64::NAN,
    }
}
