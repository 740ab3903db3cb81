//! Numerical utilities: regression, optimization, statistics and accuracy metrics.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use ols::{ols_fit, CoefficientStat, OLSResult, OlsSummary};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{quantile_normal, two_sided_z};
