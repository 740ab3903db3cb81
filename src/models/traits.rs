//! Interface for models fit on the residual space of the decomposition.

use crate::core::Forecast;
use crate::error::Result;

/// A univariate model of the trend- and season-free residual series.
///
/// Inputs and outputs are plain daily vectors; dating is handled by the
/// pipeline. The trait is object-safe and can be used as
/// `Box<dyn ResidualForecaster>`.
pub trait ResidualForecaster {
    /// Fit the model to the residual series.
    fn fit(&mut self, series: &[f64]) -> Result<()>;

    /// Point predictions for the next `horizon` days.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Predictions with symmetric Gaussian intervals at `level` (e.g. 0.8).
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast>;

    /// In-sample one-step predictions, one per training day.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Training residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Human-readable fit report.
    fn summary(&self) -> Option<String>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed residual models.
pub type BoxedResidualForecaster = Box<dyn ResidualForecaster>;
