//! Statistical and small dense linear-algebra helpers.

use crate::error::{ForecastError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use decomp_arima::utils::quantile_normal;
///
/// // 95% two-sided interval -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Two-sided critical value for a symmetric interval at `level` (e.g. 0.8).
pub fn two_sided_z(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "confidence level must lie in (0, 1), got {level}"
        )));
    }
    Ok(quantile_normal(0.5 + level / 2.0))
}

/// Lower-triangular Cholesky factor `L` with `A = L L'`.
///
/// Returns `None` if `a` is not positive definite.
pub fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        if a[i].len() != n {
            return None;
        }
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                // Pivot relative to the diagonal entry
                if !sum.is_finite() || sum <= 1e-12 * a[i][i].abs() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    Some(l)
}

fn cholesky_substitute(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    x
}

/// Inverse of a symmetric positive definite matrix.
pub fn invert_symmetric(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let l = cholesky(a)?;
    let mut inverse = vec![vec![0.0; n]; n];
    for col in 0..n {
        let mut e = vec![0.0; n];
        e[col] = 1.0;
        let x = cholesky_substitute(&l, &e);
        for (row, value) in x.into_iter().enumerate() {
            inverse[row][col] = value;
        }
    }
    Some(inverse)
}

/// Central-difference Hessian of `f` at `x`.
pub fn numerical_hessian<F>(f: F, x: &[f64]) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x.len();
    let steps: Vec<f64> = x.iter().map(|xi| 1e-4 * xi.abs().max(1.0)).collect();
    let mut hessian = vec![vec![0.0; n]; n];
    let mut point = x.to_vec();

    let eval = |point: &mut Vec<f64>, i: usize, di: f64, j: usize, dj: f64| {
        point[i] += di;
        point[j] += dj;
        let value = f(point.as_slice());
        point[i] -= di;
        point[j] -= dj;
        value
    };

    for i in 0..n {
        for j in i..n {
            let (hi, hj) = (steps[i], steps[j]);
            let value = (eval(&mut point, i, hi, j, hj)
                - eval(&mut point, i, hi, j, -hj)
                - eval(&mut point, i, -hi, j, hj)
                + eval(&mut point, i, -hi, j, -hj))
                / (4.0 * hi * hj);
            hessian[i][j] = value;
            hessian[j][i] = value;
        }
    }

    hessian
}
