//! Pipeline configuration.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the Box-Cox lambda is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxCoxLambda {
    /// Maximum likelihood on the rolling average.
    #[default]
    Estimate,
    /// Use a supplied value. `Manual(None)` fails at learn time.
    Manual(Option<f64>),
}

impl BoxCoxLambda {
    pub fn is_manual(&self) -> bool {
        matches!(self, BoxCoxLambda::Manual(_))
    }
}

/// Settings for loading, decomposing, forecasting and validating one metric.
///
/// Missing JSON fields take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the forecast metric.
    pub metric: String,
    /// Observations before this date are ignored.
    pub min_date: Option<NaiveDate>,
    /// Observations after this date are ignored.
    pub max_date: Option<NaiveDate>,
    /// Forecast horizon in days.
    pub num_days_pred: usize,
    /// Interval level for forecasts.
    pub confidence_level: f64,
    /// Interval level for validation forecasts.
    pub validation_confidence_level: f64,
    /// Relative day-over-day change flagged as anomalous.
    pub anomaly_threshold: f64,
    /// Run anomaly detection when the pipeline is created.
    pub detect_anomalies: bool,
    /// Fourier components kept in the seasonal profile (0 disables seasonality).
    pub num_fourier_components: usize,
    /// Highest Fourier index considered for the seasonal profile.
    pub fourier_cutoff: usize,
    pub trend_exponent: f64,
    /// Centered smoothing window in days (odd).
    pub rolling_window: usize,
    /// Carrying capacity estimate is this multiple of the smoothed maximum.
    pub capacity_multiplier: f64,
    pub box_cox: BoxCoxLambda,
    /// Manual carrying capacity; `None` estimates it.
    pub carrying_capacity: Option<f64>,
    /// Residual model `(p, d, q)`.
    pub order: (usize, usize, usize),
    /// Residual model `(P, D, Q, period)`.
    pub seasonal_order: (usize, usize, usize, usize),
    /// Largest percent error classified green.
    pub green_yellow_threshold: f64,
    /// Largest percent error classified yellow.
    pub yellow_red_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metric: "MaxConcurrentStreamsOverall".to_string(),
            min_date: None,
            max_date: None,
            num_days_pred: 30,
            confidence_level: 0.8,
            validation_confidence_level: 0.95,
            anomaly_threshold: 0.5,
            detect_anomalies: false,
            num_fourier_components: 3,
            fourier_cutoff: 12,
            trend_exponent: 1.0,
            rolling_window: 7,
            capacity_multiplier: 2.2,
            box_cox: BoxCoxLambda::Estimate,
            carrying_capacity: None,
            order: (1, 0, 1),
            seasonal_order: (1, 1, 1, 7),
            green_yellow_threshold: 5.0,
            yellow_red_threshold: 15.0,
        }
    }
}

impl PipelineConfig {
    /// Default configuration for `metric`.
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ForecastError::Config(format!("invalid pipeline config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ForecastError::Config(format!("cannot serialize pipeline config: {e}")))
    }

    pub fn with_date_range(mut self, min_date: Option<NaiveDate>, max_date: Option<NaiveDate>) -> Self {
        self.min_date = min_date;
        self.max_date = max_date;
        self
    }

    pub fn with_horizon(mut self, days: usize) -> Self {
        self.num_days_pred = days;
        self
    }

    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_validation_confidence_level(mut self, level: f64) -> Self {
        self.validation_confidence_level = level;
        self
    }

    pub fn with_anomaly_detection(mut self, threshold: f64) -> Self {
        self.detect_anomalies = true;
        self.anomaly_threshold = threshold;
        self
    }

    pub fn with_fourier_components(mut self, num: usize) -> Self {
        self.num_fourier_components = num;
        self
    }

    pub fn with_trend_exponent(mut self, exponent: f64) -> Self {
        self.trend_exponent = exponent;
        self
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn with_box_cox_lambda(mut self, lambda: f64) -> Self {
        self.box_cox = BoxCoxLambda::Manual(Some(lambda));
        self
    }

    pub fn with_carrying_capacity(mut self, capacity: f64) -> Self {
        self.carrying_capacity = Some(capacity);
        self
    }

    pub fn with_orders(
        mut self,
        order: (usize, usize, usize),
        seasonal_order: (usize, usize, usize, usize),
    ) -> Self {
        self.order = order;
        self.seasonal_order = seasonal_order;
        self
    }

    pub fn with_error_thresholds(mut self, green_max: f64, yellow_max: f64) -> Self {
        self.green_yellow_threshold = green_max;
        self.yellow_red_threshold = yellow_max;
        self
    }

    /// Check ranges and finiteness of every numeric setting.
    pub fn validate(&self) -> Result<()> {
        let err = |msg: String| Err(ForecastError::Config(msg));

        if self.metric.trim().is_empty() {
            return err("metric name is empty".to_string());
        }
        if let (Some(min), Some(max)) = (self.min_date, self.max_date) {
            if min > max {
                return err(format!("min_date {min} is after max_date {max}"));
            }
        }
        for (name, level) in [
            ("confidence_level", self.confidence_level),
            ("validation_confidence_level", self.validation_confidence_level),
        ] {
            if !(level > 0.0 && level < 1.0) {
                return err(format!("{name} must be in (0, 1), got {level}"));
            }
        }
        if !(self.anomaly_threshold.is_finite() && self.anomaly_threshold > 0.0) {
            return err(format!("anomaly_threshold must be positive, got {}", self.anomaly_threshold));
        }
        if !(self.trend_exponent.is_finite() && self.trend_exponent > 0.0) {
            return err(format!("trend_exponent must be positive, got {}", self.trend_exponent));
        }
        if self.rolling_window == 0 || self.rolling_window % 2 == 0 {
            return err(format!("rolling_window must be odd, got {}", self.rolling_window));
        }
        if !(self.capacity_multiplier.is_finite() && self.capacity_multiplier > 0.0) {
            return err(format!(
                "capacity_multiplier must be positive, got {}",
                self.capacity_multiplier
            ));
        }
        if let BoxCoxLambda::Manual(Some(lambda)) = self.box_cox {
            if !lambda.is_finite() {
                return err(format!("manual Box-Cox lambda must be finite, got {lambda}"));
            }
        }
        if let Some(capacity) = self.carrying_capacity {
            if !(capacity.is_finite() && capacity > 0.0) {
                return err(format!("carrying_capacity must be positive, got {capacity}"));
            }
        }
        if self.seasonal_order.3 == 0 && self.seasonal_order != (0, 0, 0, 0) {
            return err("seasonal period must be positive for a seasonal model".to_string());
        }
        if !(self.green_yellow_threshold.is_finite()
            && self.yellow_red_threshold.is_finite()
            && self.green_yellow_threshold <= self.yellow_red_threshold)
        {
            return err(format!(
                "error thresholds must satisfy green ({}) <= yellow ({})",
                self.green_yellow_threshold, self.yellow_red_threshold
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.metric, "MaxConcurrentStreamsOverall");
        assert_eq!(config.num_days_pred, 30);
        assert_eq!(config.num_fourier_components, 3);
        assert_eq!(config.box_cox, BoxCoxLambda::Estimate);
        assert_eq!(config.order, (1, 0, 1));
        assert_eq!(config.seasonal_order, (1, 1, 1, 7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders() {
        let config = PipelineConfig::new("Streams")
            .with_horizon(10)
            .with_box_cox_lambda(0.0)
            .with_carrying_capacity(500.0)
            .with_anomaly_detection(0.8);
        assert_eq!(config.metric, "Streams");
        assert_eq!(config.num_days_pred, 10);
        assert_eq!(config.box_cox, BoxCoxLambda::Manual(Some(0.0)));
        assert!(config.box_cox.is_manual());
        assert_eq!(config.carrying_capacity, Some(500.0));
        assert!(config.detect_anomalies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            PipelineConfig::default().with_confidence_level(1.0),
            PipelineConfig::default().with_validation_confidence_level(0.0),
            PipelineConfig::default().with_rolling_window(6),
            PipelineConfig::default().with_error_thresholds(20.0, 10.0),
            PipelineConfig::default().with_carrying_capacity(-1.0),
            PipelineConfig::default().with_trend_exponent(f64::NAN),
            PipelineConfig::new(" "),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ForecastError::Config(_))), "{config:?}");
        }
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"metric": "Logins", "num_days_pred": 14, "box_cox": {"manual": 0.5}, "min_date": "2023-01-01"}"#,
        )
        .unwrap();
        assert_eq!(config.metric, "Logins");
        assert_eq!(config.num_days_pred, 14);
        assert_eq!(config.box_cox, BoxCoxLambda::Manual(Some(0.5)));
        assert_eq!(config.min_date, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(config.fourier_cutoff, 12);
    }

    #[test]
    fn json_round_trip_and_errors() {
        let config = PipelineConfig::new("Logins").with_box_cox_lambda(0.25);
        let json = config.to_json_string().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);

        assert!(matches!(
            PipelineConfig::from_json_str("{not json"),
            Err(ForecastError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"confidence_level": 2.0}"#),
            Err(ForecastError::Config(_))
        ));
    }
}
