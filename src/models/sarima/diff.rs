//! Lag polynomials and differencing for seasonal ARIMA models.
//!
//! A lag polynomial `c_0 + c_1 B + c_2 B^2 + ...` is stored as its
//! coefficient vector `[c_0, c_1, c_2, ...]`.

/// Product of two lag polynomials.
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// `1 + sign * (c_1 B^step + c_2 B^{2 step} + ...)`.
pub fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (k, &c) in coefficients.iter().enumerate() {
        poly[(k + 1) * step] = sign * c;
    }
    poly
}

/// Differencing operator `(1 - B)^d (1 - B^period)^seasonal_d`.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        for _ in 0..seasonal_d {
            poly = poly_mul(&poly, &lag_polynomial(&[1.0], period, -1.0));
        }
    }
    poly
}

/// Apply a lag polynomial to a series.
///
/// The first `poly.len() - 1` values have incomplete lags and are dropped.
pub fn apply_lag_polynomial(series: &[f64], poly: &[f64]) -> Vec<f64> {
    let order = poly.len().saturating_sub(1);
    if series.len() <= order {
        return vec![];
    }
    (order..series.len())
        .map(|t| poly.iter().enumerate().map(|(k, c)| c * series[t - k]).sum())
        .collect()
}

/// Recover `y_t` from a differenced value `w_t` and the preceding levels.
///
/// `history` must end at `y_{t-1}` and hold at least `poly.len() - 1` values.
pub fn undifference_next(w: f64, history: &[f64], poly: &[f64]) -> f64 {
    let n = history.len();
    w - poly
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| c * history[n - k])
        .sum::<f64>()
}
