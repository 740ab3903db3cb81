//! Residual-space forecasting models.

mod traits;

pub mod sarima;

pub use sarima::{SARIMASpec, SARIMA};
pub use traits::{BoxedResidualForecaster, ResidualForecaster};
