//! # decomp-arima
//!
//! Daily metric forecasting by decomposition.
//!
//! A history is split into a Box-Cox stabilized global trend (linear over the
//! observed range, logistic beyond it), an annual Fourier-filtered seasonal
//! profile, and a residual modeled by a seasonal ARIMA. Forecasts recombine
//! the residual forecast with the deterministic components; validation refits
//! on truncated history and scores the held-out tail.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod decomposition;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod transform;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{BoxCoxLambda, PipelineConfig};
    pub use crate::core::{
        DailySeries, ErrorBand, Forecast, ForecastTable, Observation, SeriesStore, ValidationTable,
    };
    pub use crate::decomposition::{SpaceConverter, TrendParameters};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::ResidualForecaster;
    pub use crate::pipeline::{DecomposedArima, PipelineState};
    pub use crate::utils::{calculate_metrics, quantile_normal, AccuracyMetrics};
}
