//! Accuracy metrics for held-out forecast evaluation.

use crate::error::{ForecastError, Result};

/// Aggregate accuracy of a forecast over held-out days.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Mean absolute percent error; `None` when any observed value is zero.
    pub mape: Option<f64>,
    /// Symmetric percent error, 0 to 200.
    pub smape: f64,
    /// Coefficient of determination against the observed mean.
    pub r_squared: f64,
}

impl AccuracyMetrics {
    /// Metrics of an empty comparison.
    pub fn undefined() -> Self {
        Self {
            mae: f64::NAN,
            mse: f64::NAN,
            rmse: f64::NAN,
            mape: None,
            smape: f64::NAN,
            r_squared: f64::NAN,
        }
    }
}

#[derive(Default)]
struct ErrorSums {
    absolute: f64,
    squared: f64,
    relative: f64,
    symmetric: f64,
    spread: f64,
    zero_observed: bool,
}

/// Compare `predicted` against `actual` day by day.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let mean_actual = actual.iter().sum::<f64>() / n;

    let sums = actual
        .iter()
        .zip(predicted)
        .fold(ErrorSums::default(), |mut acc, (&a, &p)| {
            let error = p - a;
            acc.absolute += error.abs();
            acc.squared += error * error;
            acc.spread += (a - mean_actual).powi(2);
            if a == 0.0 {
                acc.zero_observed = true;
            } else {
                acc.relative += (error / a).abs();
            }
            let scale = a.abs() + p.abs();
            if scale > 0.0 {
                acc.symmetric += 2.0 * error.abs() / scale;
            }
            acc
        });

    let mse = sums.squared / n;
    Ok(AccuracyMetrics {
        mae: sums.absolute / n,
        mse,
        rmse: mse.sqrt(),
        mape: (!sums.zero_observed).then(|| 100.0 * sums.relative / n),
        smape: 100.0 * sums.symmetric / n,
        // A flat observed window has no spread to explain.
        r_squared: if sums.spread == 0.0 {
            1.0
        } else {
            1.0 - sums.squared / sums.spread
        },
    })
}
