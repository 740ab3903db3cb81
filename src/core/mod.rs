//! Core data structures: daily series, the metric store and output tables.

mod forecast;
mod series;
mod store;
pub mod tables;

pub use forecast::Forecast;
pub use series::{date_range, DailySeries};
pub use store::{Anomaly, Observation, SeriesStore};
pub use tables::{
    ErrorBand, ForecastRow, ForecastTable, ValidationRow, ValidationSummary, ValidationTable,
};
