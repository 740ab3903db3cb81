//! Forecasting and validation pipeline.

mod decomposed;
mod validation;

pub use decomposed::{DecomposedArima, PipelineState};
pub use validation::ValidationHarness;
