//! Decomposed ARIMA forecaster: Box-Cox, trend and seasonality removed
//! deterministically, residuals modeled by a seasonal ARIMA.

use super::validation::ValidationHarness;
use crate::config::{BoxCoxLambda, PipelineConfig};
use crate::core::{
    date_range, Anomaly, DailySeries, ForecastRow, ForecastTable, Observation, SeriesStore,
    ValidationTable,
};
use crate::decomposition::{LearnedTransforms, SpaceConverter, TransformLearner, TrendParameters};
use crate::error::{ForecastError, Result};
use crate::models::{BoxedResidualForecaster, SARIMASpec, SARIMA};
use chrono::{Duration, Months, NaiveDate};
use std::fmt;

/// Lifecycle of a [`DecomposedArima`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Uninitialized,
    TrendLearned,
    Trained,
}

/// Forecasts one daily metric by decomposition.
///
/// # Example
///
/// ```
/// use decomp_arima::prelude::*;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
/// let values = (0..400).map(|i| 100.0 + 2.0 * i as f64).collect();
/// let store = SeriesStore::from_series("Streams", DailySeries::new(start, values)).unwrap();
///
/// let config = PipelineConfig::new("Streams").with_box_cox_lambda(1.0);
/// let mut pipeline = DecomposedArima::new(store, config).unwrap();
/// let table = pipeline.predict(10, 0.8).unwrap();
/// assert_eq!(table.forecast_rows().count(), 10);
/// ```
pub struct DecomposedArima {
    config: PipelineConfig,
    store: SeriesStore,
    anomalies: Vec<Anomaly>,
    learned: Option<LearnedTransforms>,
    model: BoxedResidualForecaster,
    state: PipelineState,
}

impl fmt::Debug for DecomposedArima {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecomposedArima")
            .field("metric", &self.store.metric())
            .field("state", &self.state)
            .field("model", &self.model.name())
            .finish()
    }
}

impl DecomposedArima {
    /// Create a pipeline over `store`.
    ///
    /// Runs anomaly detection when `config.detect_anomalies` is set.
    pub fn new(store: SeriesStore, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let anomalies = if config.detect_anomalies {
            store.detect_anomalies(config.anomaly_threshold)
        } else {
            Vec::new()
        };
        let model: BoxedResidualForecaster =
            Box::new(SARIMA::new(SARIMASpec::new(config.order, config.seasonal_order)));
        Ok(Self {
            config,
            store,
            anomalies,
            learned: None,
            model,
            state: PipelineState::Uninitialized,
        })
    }

    /// Load raw readings for `config.metric` within the configured date range.
    pub fn from_observations(observations: &[Observation], config: PipelineConfig) -> Result<Self> {
        let store = SeriesStore::load(
            observations,
            config.metric.clone(),
            config.min_date,
            config.max_date,
        )?;
        Self::new(store, config)
    }

    /// Replace the residual model. Only allowed before training.
    pub fn with_residual_model(mut self, model: BoxedResidualForecaster) -> Result<Self> {
        if self.state == PipelineState::Trained {
            return Err(ForecastError::InvalidParameter(
                "cannot replace the residual model after training".to_string(),
            ));
        }
        self.model = model;
        Ok(self)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// Anomalies found at construction (empty unless detection was enabled).
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn learned(&self) -> Option<&LearnedTransforms> {
        self.learned.as_ref()
    }

    pub fn trend_params(&self) -> Option<&TrendParameters> {
        self.learned.as_ref().map(|l| &l.params)
    }

    fn ensure_uninitialized(&self, what: &str) -> Result<()> {
        if self.state != PipelineState::Uninitialized {
            return Err(ForecastError::InvalidParameter(format!(
                "cannot {what} after trend parameters have been learned"
            )));
        }
        Ok(())
    }

    /// Interpolate over a corrupted interval of the training data.
    pub fn patch(&mut self, first_date: NaiveDate, last_date: NaiveDate) -> Result<()> {
        self.ensure_uninitialized("patch the series")?;
        self.store.patch(first_date, last_date)
    }

    pub fn set_box_cox_param(&mut self, lambda: f64) -> Result<()> {
        self.ensure_uninitialized("set the Box-Cox lambda")?;
        if !lambda.is_finite() {
            return Err(ForecastError::InvalidParameter(format!(
                "Box-Cox lambda must be finite, got {lambda}"
            )));
        }
        self.config.box_cox = BoxCoxLambda::Manual(Some(lambda));
        Ok(())
    }

    pub fn set_carrying_capacity(&mut self, capacity: f64) -> Result<()> {
        self.ensure_uninitialized("set the carrying capacity")?;
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "carrying capacity must be positive, got {capacity}"
            )));
        }
        self.config.carrying_capacity = Some(capacity);
        Ok(())
    }

    pub fn set_num_fourier_components(&mut self, num: usize) -> Result<()> {
        self.ensure_uninitialized("set the number of Fourier components")?;
        self.config.num_fourier_components = num;
        Ok(())
    }

    pub fn set_trend_exponent(&mut self, exponent: f64) -> Result<()> {
        self.ensure_uninitialized("set the trend exponent")?;
        if !(exponent.is_finite() && exponent > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "trend exponent must be positive, got {exponent}"
            )));
        }
        self.config.trend_exponent = exponent;
        Ok(())
    }

    /// Learn Box-Cox lambda, carrying capacity, trend and seasonality.
    ///
    /// Learning again on the same data gives the same parameters.
    pub fn learn_trend_params(&mut self) -> Result<&TrendParameters> {
        log::info!("Learning trend parameters for '{}'", self.store.metric());
        let learned = TransformLearner::new(&self.config).learn(&self.store)?;
        let learned = self.learned.insert(learned);
        self.state = self.state.max(PipelineState::TrendLearned);
        Ok(&learned.params)
    }

    /// Transforms between raw and residual space.
    pub fn converter(&self) -> Result<SpaceConverter<'_>> {
        self.learned
            .as_ref()
            .map(SpaceConverter::new)
            .ok_or_else(|| ForecastError::NotLearned("trend parameters have not been learned".to_string()))
    }

    /// Fit the residual model on the whole training series, learning the
    /// trend first if needed.
    pub fn fit(&mut self) -> Result<()> {
        if self.state == PipelineState::Uninitialized {
            self.learn_trend_params()?;
        }
        let residuals = self.converter()?.to_residual_space(self.store.series())?;
        log::info!("Fitting residual model {}", self.model.name());
        self.model.fit(residuals.values())?;
        self.state = PipelineState::Trained;
        Ok(())
    }

    /// Forecast `horizon` days past the last observed date.
    ///
    /// The table covers the observed history (observed values and in-sample
    /// predictions) followed by the horizon (out-of-sample predictions and
    /// bounds at `level`).
    pub fn predict(&mut self, horizon: usize, level: f64) -> Result<ForecastTable> {
        if self.state != PipelineState::Trained {
            self.fit()?;
        }
        let converter = self.converter()?;
        let first = self.store.first_observed_date();
        let future_start = self.store.last_observed_date() + Duration::days(1);

        let fitted = self
            .model
            .fitted_values()
            .ok_or_else(|| ForecastError::NotLearned("residual model has not been fit".to_string()))?;
        let in_sample = converter.to_raw_space(&DailySeries::new(first, fitted.to_vec()))?;

        let forecast = self.model.predict_with_intervals(horizon, level)?;
        let to_raw = |values: Option<&[f64]>| -> Result<DailySeries> {
            let values = values.ok_or_else(|| {
                ForecastError::ComputationError("residual model returned no intervals".to_string())
            })?;
            converter.to_raw_space(&DailySeries::new(future_start, values.to_vec()))
        };
        let point = to_raw(Some(forecast.point()))?;
        let lower = to_raw(forecast.lower())?;
        let upper = to_raw(forecast.upper())?;

        let mut rows: Vec<ForecastRow> = self
            .store
            .series()
            .iter()
            .zip(in_sample.values())
            .map(|((date, observed), &fitted)| ForecastRow {
                observed: Some(observed),
                in_sample: Some(fitted),
                ..ForecastRow::empty(date)
            })
            .collect();
        rows.extend((0..point.len()).map(|i| ForecastRow {
            out_of_sample: Some(point.values()[i]),
            lower: Some(lower.values()[i]),
            upper: Some(upper.values()[i]),
            ..ForecastRow::empty(point.date_at(i))
        }));

        Ok(ForecastTable {
            metric: self.store.metric().to_string(),
            confidence_level: level,
            rows,
        })
    }

    /// Forecast with the configured horizon and confidence level.
    pub fn predict_default(&mut self) -> Result<ForecastTable> {
        self.predict(self.config.num_days_pred, self.config.confidence_level)
    }

    pub fn max_forecast_end_date(&self) -> NaiveDate {
        self.store.last_observed_date() + Duration::days(self.config.num_days_pred as i64)
    }

    /// One calendar month before the last observed date.
    pub fn default_validation_cutoff(&self) -> Result<NaiveDate> {
        let last = self.store.last_observed_date();
        last.checked_sub_months(Months::new(1))
            .ok_or_else(|| ForecastError::Config(format!("no date one month before {last}")))
    }

    /// Dates the forecast table will cover for the configured horizon.
    pub fn forecast_dates(&self) -> impl Iterator<Item = NaiveDate> {
        date_range(self.store.first_observed_date(), self.max_forecast_end_date())
    }

    /// OLS summary of the trend fit.
    pub fn trend_summary(&self) -> Result<String> {
        self.learned
            .as_ref()
            .map(|l| l.trend_summary.to_string())
            .ok_or_else(|| ForecastError::NotLearned("trend parameters have not been learned".to_string()))
    }

    /// Fit report of the residual model.
    pub fn residual_summary(&self) -> Result<String> {
        if self.state != PipelineState::Trained {
            return Err(ForecastError::NotLearned("residual model has not been fit".to_string()));
        }
        self.model
            .summary()
            .ok_or_else(|| ForecastError::NotLearned("residual model has no summary".to_string()))
    }

    /// Back-test on data through `cutoff`.
    pub fn validate(&self, cutoff: NaiveDate, level: f64) -> Result<ValidationTable> {
        ValidationHarness::new(self).validate(cutoff, level)
    }

    /// Back-test from the default cutoff at the validation confidence level.
    pub fn validate_default(&self) -> Result<ValidationTable> {
        self.validate(
            self.default_validation_cutoff()?,
            self.config.validation_confidence_level,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn linear_pipeline(config: PipelineConfig) -> DecomposedArima {
        let values = (0..400).map(|i| 100.0 + 2.0 * i as f64).collect();
        let store = SeriesStore::from_series("Streams", DailySeries::new(date(2022, 1, 1), values)).unwrap();
        DecomposedArima::new(store, config).unwrap()
    }

    #[test]
    fn state_machine_moves_forward() {
        let mut pipeline = linear_pipeline(PipelineConfig::new("Streams").with_box_cox_lambda(1.0));
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);
        assert!(matches!(pipeline.converter(), Err(ForecastError::NotLearned(_))));
        assert!(matches!(pipeline.trend_summary(), Err(ForecastError::NotLearned(_))));

        pipeline.learn_trend_params().unwrap();
        assert_eq!(pipeline.state(), PipelineState::TrendLearned);
        assert!(pipeline.trend_summary().unwrap().contains("x1"));
        assert!(matches!(pipeline.residual_summary(), Err(ForecastError::NotLearned(_))));

        pipeline.fit().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Trained);
        assert!(pipeline.residual_summary().unwrap().contains("SARIMA"));

        pipeline.learn_trend_params().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Trained);
    }

    #[test]
    fn negative_estimated_lambda_needs_manual_override() {
        let values = (0..400)
            .map(|i| 100.0 * (4.0 * (i as f64 / 400.0).powi(3)).exp())
            .collect();
        let store = SeriesStore::from_series("Streams", DailySeries::new(date(2022, 1, 1), values)).unwrap();

        let mut estimated = DecomposedArima::new(store.clone(), PipelineConfig::new("Streams")).unwrap();
        assert!(matches!(
            estimated.learn_trend_params(),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert_eq!(estimated.state(), PipelineState::Uninitialized);
        assert!(estimated.learned().is_none());

        let mut manual = DecomposedArima::new(store, PipelineConfig::new("Streams")).unwrap();
        manual.set_box_cox_param(0.0).unwrap();
        assert_eq!(manual.learn_trend_params().unwrap().box_cox_lambda, 0.0);
        assert_eq!(manual.state(), PipelineState::TrendLearned);
    }

    #[test]
    fn setters_only_before_learning() {
        let mut pipeline = linear_pipeline(PipelineConfig::new("Streams"));
        pipeline.set_box_cox_param(1.0).unwrap();
        pipeline.set_carrying_capacity(5000.0).unwrap();
        pipeline.set_num_fourier_components(2).unwrap();
        pipeline.set_trend_exponent(1.0).unwrap();
        assert!(pipeline.set_carrying_capacity(-3.0).is_err());

        let params = *pipeline.learn_trend_params().unwrap();
        assert_relative_eq!(params.carrying_capacity, 5000.0);
        assert_relative_eq!(params.box_cox_lambda, 1.0);

        for result in [
            pipeline.set_box_cox_param(0.5),
            pipeline.set_carrying_capacity(10.0),
            pipeline.set_num_fourier_components(1),
            pipeline.set_trend_exponent(2.0),
            pipeline.patch(date(2022, 3, 1), date(2022, 3, 2)),
        ] {
            assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
        }
    }

    #[test]
    fn forecast_table_layout() {
        let mut pipeline = linear_pipeline(PipelineConfig::new("Streams").with_box_cox_lambda(1.0));
        let table = pipeline.predict(10, 0.8).unwrap();

        assert_eq!(table.len(), 410);
        assert_eq!(table.first_date(), Some(date(2022, 1, 1)));
        assert_eq!(table.column_names()[4], "80%ConfIntLower");

        let history = table.row(date(2022, 6, 1)).unwrap();
        assert!(history.observed.is_some() && history.in_sample.is_some());
        assert!(history.out_of_sample.is_none() && history.lower.is_none());

        let future = table.row(date(2023, 2, 5)).unwrap();
        assert!(future.observed.is_none() && future.in_sample.is_none());
        let (point, lower, upper) = (
            future.out_of_sample.unwrap(),
            future.lower.unwrap(),
            future.upper.unwrap(),
        );
        assert!(lower <= point && point <= upper);
    }

    #[test]
    fn dates_derived_from_last_observed() {
        let pipeline = linear_pipeline(PipelineConfig::new("Streams").with_horizon(30));
        assert_eq!(pipeline.store().last_observed_date(), date(2023, 2, 4));
        assert_eq!(pipeline.max_forecast_end_date(), date(2023, 3, 6));
        assert_eq!(pipeline.default_validation_cutoff().unwrap(), date(2023, 1, 4));
        assert_eq!(pipeline.forecast_dates().count(), 430);
    }

    #[test]
    fn anomalies_detected_on_request() {
        let mut values: Vec<f64> = vec![100.0; 60];
        values[30] = 400.0;
        let store = SeriesStore::from_series("Streams", DailySeries::new(date(2022, 1, 1), values)).unwrap();

        let quiet = DecomposedArima::new(store.clone(), PipelineConfig::new("Streams")).unwrap();
        assert!(quiet.anomalies().is_empty());

        let config = PipelineConfig::new("Streams").with_anomaly_detection(0.5);
        let pipeline = DecomposedArima::new(store, config).unwrap();
        assert_eq!(pipeline.anomalies().len(), 2);
        assert_eq!(pipeline.anomalies()[0].date, date(2022, 1, 31));
    }

    #[test]
    fn from_observations_applies_date_clip() {
        let observations: Vec<Observation> = (0..50)
            .map(|i| Observation::daily(date(2022, 1, 1) + Duration::days(i), 10.0 + i as f64))
            .collect();
        let config = PipelineConfig::new("Streams").with_date_range(Some(date(2022, 1, 10)), None);
        let pipeline = DecomposedArima::from_observations(&observations, config).unwrap();
        assert_eq!(pipeline.store().first_observed_date(), date(2022, 1, 10));
        assert_eq!(pipeline.store().len(), 41);
    }
}
