//! Box-Cox power transformation.
//!
//! Stabilizes the variance of a positive series before trend fitting.

use crate::error::{ForecastError, Result};

/// Lambdas this close to zero use the logarithmic branch.
pub const LAMBDA_ZERO_TOLERANCE: f64 = 1e-10;

/// Transform a single positive value.
///
/// For lambda != 0: y = (x^lambda - 1) / lambda
/// For lambda == 0: y = ln(x)
pub fn boxcox_value(x: f64, lambda: f64) -> Result<f64> {
    if x.is_nan() || x <= 0.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "Box-Cox requires positive data, got {x}"
        )));
    }
    if lambda.abs() < LAMBDA_ZERO_TOLERANCE {
        Ok(x.ln())
    } else {
        Ok((x.powf(lambda) - 1.0) / lambda)
    }
}

/// Invert a single transformed value.
///
/// For lambda != 0: x = (lambda * y + 1)^(1/lambda)
/// For lambda == 0: x = exp(y)
///
/// A negative base is only defined when `1/lambda` is an integer.
pub fn inv_boxcox_value(y: f64, lambda: f64) -> Result<f64> {
    if lambda.abs() < LAMBDA_ZERO_TOLERANCE {
        return Ok(y.exp());
    }

    let base = lambda * y + 1.0;
    let exponent = 1.0 / lambda;
    if base >= 0.0 {
        return Ok(base.powf(exponent));
    }

    let rounded = exponent.round();
    if (exponent - rounded).abs() < 1e-12 && rounded.abs() <= i32::MAX as f64 {
        Ok(base.powi(rounded as i32))
    } else {
        Err(ForecastError::InvalidParameter(format!(
            "inverse Box-Cox undefined for y = {y} with lambda = {lambda}"
        )))
    }
}

/// Apply Box-Cox transformation with a given lambda.
///
/// # Errors
/// `InvalidParameter` if any value is not positive.
pub fn boxcox(series: &[f64], lambda: f64) -> Result<Vec<f64>> {
    series.iter().map(|&x| boxcox_value(x, lambda)).collect()
}

/// Inverse Box-Cox transformation.
pub fn inv_boxcox(transformed: &[f64], lambda: f64) -> Result<Vec<f64>> {
    transformed
        .iter()
        .map(|&y| inv_boxcox_value(y, lambda))
        .collect()
}

/// Find the maximum likelihood Box-Cox lambda.
///
/// Grid search over [-2, 2] in steps of 0.01, then a finer search within
/// 0.1 of the best grid point.
pub fn boxcox_lambda(series: &[f64]) -> Result<f64> {
    if let Some(&bad) = series.iter().find(|&&x| x.is_nan() || x <= 0.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Box-Cox requires positive data, got {bad}"
        )));
    }
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: series.len(),
        });
    }

    let log_sum: f64 = series.iter().map(|x| x.ln()).sum();

    let mut best_lambda = 1.0;
    let mut best_llf = f64::NEG_INFINITY;

    for i in -200..=200 {
        let lambda = i as f64 / 100.0;
        let llf = boxcox_llf(series, log_sum, lambda);

        if llf > best_llf {
            best_llf = llf;
            best_lambda = lambda;
        }
    }

    let start = (best_lambda - 0.1).max(-2.0);
    let end = (best_lambda + 0.1).min(2.0);

    for i in 0..=100 {
        let lambda = start + (end - start) * i as f64 / 100.0;
        let llf = boxcox_llf(series, log_sum, lambda);

        if llf > best_llf {
            best_llf = llf;
            best_lambda = lambda;
        }
    }

    if !best_llf.is_finite() {
        return Err(ForecastError::ComputationError(
            "Box-Cox likelihood is flat; series may be constant".to_string(),
        ));
    }

    Ok(best_lambda)
}

/// Profile log-likelihood, ignoring constant terms:
/// -n/2 * ln(variance) + (lambda - 1) * sum(ln(x))
fn boxcox_llf(series: &[f64], log_sum: f64, lambda: f64) -> f64 {
    let n = series.len() as f64;
    let transformed: Vec<f64> = series
        .iter()
        .map(|&x| {
            if lambda.abs() < LAMBDA_ZERO_TOLERANCE {
                x.ln()
            } else {
                (x.powf(lambda) - 1.0) / lambda
            }
        })
        .collect();

    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    if !variance.is_finite() || variance <= 0.0 {
        return f64::NEG_INFINITY;
    }

    -0.5 * n * variance.ln() + (lambda - 1.0) * log_sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn boxcox_lambda_1_shifts_by_one() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = boxcox(&series, 1.0).unwrap();

        for (r, x) in result.iter().zip(series.iter()) {
            assert_relative_eq!(*r, x - 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn boxcox_lambda_0_is_log() {
        let series = vec![0.5, 1.0, 2.0, 1e6];
        let result = boxcox(&series, 0.0).unwrap();

        for (r, x) in result.iter().zip(series.iter()) {
            assert_relative_eq!(*r, x.ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn boxcox_lambda_2() {
        let result = boxcox(&[1.0, 2.0, 3.0], 2.0).unwrap();

        assert_relative_eq!(result[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(result[1], 1.5, epsilon = 1e-10);
        assert_relative_eq!(result[2], 4.0, epsilon = 1e-10);
    }

    #[test]
    fn boxcox_rejects_non_positive() {
        assert!(matches!(
            boxcox(&[1.0, 0.0], 1.0),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(boxcox(&[-1.0], 0.0).is_err());
        assert!(boxcox(&[], 1.0).unwrap().is_empty());
    }

    #[test]
    fn inverse_recovers_input() {
        let series = vec![1.0, 2.0, 3.0, 40.0, 500.0];
        for lambda in [-0.7, 0.0, 0.25, 0.5, 1.0, 1.3] {
            let transformed = boxcox(&series, lambda).unwrap();
            let recovered = inv_boxcox(&transformed, lambda).unwrap();
            for (orig, rec) in series.iter().zip(recovered.iter()) {
                assert_relative_eq!(orig, rec, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn inverse_negative_base_needs_integer_reciprocal() {
        // lambda = 0.5: base = 0.5 * -4 + 1 = -1, exponent 2
        assert_relative_eq!(inv_boxcox_value(-4.0, 0.5).unwrap(), 1.0, epsilon = 1e-12);
        // lambda = 1: exponent 1 passes the base through
        assert_relative_eq!(inv_boxcox_value(-3.0, 1.0).unwrap(), -2.0, epsilon = 1e-12);
        // lambda = 0.3: exponent 3.33...
        assert!(matches!(
            inv_boxcox_value(-10.0, 0.3),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn boxcox_lambda_stays_in_range() {
        let series: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let lambda = boxcox_lambda(&series).unwrap();
        assert!((-2.0..=2.0).contains(&lambda));
    }

    #[test]
    fn boxcox_lambda_exponential_data_near_zero() {
        let series: Vec<f64> = (1..=10).map(|i| (i as f64).exp()).collect();
        let lambda = boxcox_lambda(&series).unwrap();

        assert!(
            lambda.abs() < 0.5,
            "Expected lambda near 0 for exponential data, got {}",
            lambda
        );
    }

    #[test]
    fn boxcox_lambda_rejects_bad_input() {
        assert!(matches!(
            boxcox_lambda(&[1.0]),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert!(matches!(
            boxcox_lambda(&[1.0, -2.0, 3.0]),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(boxcox_lambda(&[3.0, 3.0, 3.0]).is_err());
    }
}
