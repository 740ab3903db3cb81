//! Seasonal ARIMA models for the residual space.
//!
//! This module provides:
//! - SARIMA(p, d, q)(P, D, Q)\[s\] without intercept, fit by conditional sum of squares
//! - Lag-polynomial and differencing helpers

mod diff;
mod model;

pub use diff::{
    apply_lag_polynomial, differencing_polynomial, lag_polynomial, poly_mul, undifference_next,
};
pub use model::{SARIMASpec, SarimaCoefficient, SarimaSummary, SARIMA};
