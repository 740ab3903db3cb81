//! Back-testing by refitting on truncated history.

use super::decomposed::DecomposedArima;
use crate::core::{date_range, ValidationRow, ValidationTable};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};

/// Refits a fresh pipeline on the parent's data through a cutoff and scores
/// its forecast against the held-out tail.
///
/// The child inherits the parent's configuration, including a manually set
/// Box-Cox lambda. The carrying capacity and all learned parameters are
/// re-estimated from the truncated data.
#[derive(Debug, Clone, Copy)]
pub struct ValidationHarness<'a> {
    parent: &'a DecomposedArima,
}

impl<'a> ValidationHarness<'a> {
    pub fn new(parent: &'a DecomposedArima) -> Self {
        Self { parent }
    }

    /// Score forecasts for every day in `(cutoff, last_observed_date]`.
    pub fn validate(&self, cutoff: NaiveDate, level: f64) -> Result<ValidationTable> {
        let store = self.parent.store();
        let last = store.last_observed_date();
        if cutoff >= last {
            return Err(ForecastError::InvalidParameter(format!(
                "validation cutoff {cutoff} must be before the last observed date {last}"
            )));
        }

        let parent_config = self.parent.config();
        let mut config = parent_config.clone();
        config.carrying_capacity = None;
        config.detect_anomalies = false;

        let horizon = (last - cutoff).num_days() as usize;
        log::info!("Validating '{}' from {cutoff} over {horizon} days", store.metric());

        let mut child = DecomposedArima::new(store.truncated(cutoff)?, config)?;
        let forecast = child.predict(horizon, level)?;

        let thresholds = (
            parent_config.green_yellow_threshold,
            parent_config.yellow_red_threshold,
        );
        let rows = date_range(cutoff + Duration::days(1), last)
            .map(|date| {
                let observed = store.series().get(date);
                let predicted = forecast.row(date);
                match (observed, predicted) {
                    (Some(observed), Some(row)) => {
                        let point = row.out_of_sample.unwrap_or(f64::NAN);
                        let bounds = (row.lower.unwrap_or(f64::NAN), row.upper.unwrap_or(f64::NAN));
                        Ok(ValidationRow::score(date, observed, point, bounds, thresholds))
                    }
                    _ => Err(ForecastError::OutOfRange {
                        date,
                        first: store.first_observed_date(),
                        last: Some(last),
                    }),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ValidationTable {
            metric: store.metric().to_string(),
            cutoff,
            confidence_level: level,
            rows,
        })
    }
}
