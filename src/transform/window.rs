//! Rolling window functions.

use crate::core::DailySeries;
use crate::error::{ForecastError, Result};
use chrono::Duration;

/// Centered rolling mean over complete windows only.
///
/// The output has `series.len() - window + 1` values; element `i` is the mean
/// of `series[i..i + window]` and is centered on input index `i + window / 2`.
/// `window` must be odd so every output value has a center day.
pub fn rolling_mean(series: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 || window % 2 == 0 {
        return Err(ForecastError::Config(format!(
            "rolling window must be a positive odd number of days, got {window}"
        )));
    }
    if series.len() < window {
        return Err(ForecastError::InsufficientData {
            needed: window,
            got: series.len(),
        });
    }

    let w = window as f64;
    let mut sum: f64 = series[..window].iter().sum();
    let mut result = Vec::with_capacity(series.len() - window + 1);
    result.push(sum / w);

    for i in window..series.len() {
        sum += series[i] - series[i - window];
        result.push(sum / w);
    }

    Ok(result)
}

/// Centered rolling mean of a daily series, dated by each window's center day.
///
/// `window / 2` days are dropped at each end.
pub fn rolling_mean_daily(series: &DailySeries, window: usize) -> Result<DailySeries> {
    let values = rolling_mean(series.values(), window)?;
    let start = series.start() + Duration::days((window / 2) as i64);
    Ok(DailySeries::new(start, values))
}
