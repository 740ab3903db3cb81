//! Forecast and validation output tables.

use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use chrono::NaiveDate;
use serde::Serialize;

/// Column header prefix for interval bounds at `level`, e.g. `80%ConfInt`.
pub fn interval_prefix(level: f64) -> String {
    format!("{}%ConfInt", (100.0 * level).round() as i64)
}

/// One day of a forecast table. Absent cells are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub observed: Option<f64>,
    pub in_sample: Option<f64>,
    pub out_of_sample: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ForecastRow {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            observed: None,
            in_sample: None,
            out_of_sample: None,
            lower: None,
            upper: None,
        }
    }
}

/// Observed history plus forecast horizon, one row per day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastTable {
    pub metric: String,
    pub confidence_level: f64,
    pub rows: Vec<ForecastRow>,
}

impl ForecastTable {
    /// Header names in row order: date, metric, in-sample, out-of-sample, lower, upper.
    pub fn column_names(&self) -> [String; 6] {
        let prefix = interval_prefix(self.confidence_level);
        [
            "date".to_string(),
            self.metric.clone(),
            "InSamplePredictions".to_string(),
            "OoSamplePredictions".to_string(),
            format!("{prefix}Lower"),
            format!("{prefix}Upper"),
        ]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Row for `date`, if the table covers it.
    pub fn row(&self, date: NaiveDate) -> Option<&ForecastRow> {
        let first = self.first_date()?;
        let offset = (date - first).num_days();
        if offset < 0 {
            return None;
        }
        self.rows.get(offset as usize)
    }

    /// Rows carrying an out-of-sample forecast.
    pub fn forecast_rows(&self) -> impl Iterator<Item = &ForecastRow> {
        self.rows.iter().filter(|r| r.out_of_sample.is_some())
    }
}

/// Traffic-light rating of a validation row's percent error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBand {
    Green,
    Yellow,
    Red,
    /// Percent error undefined because the observed value is not positive.
    Unscored,
}

impl ErrorBand {
    /// Classify a percent error against inclusive upper bounds for green and yellow.
    pub fn classify(percent_error: f64, green_max: f64, yellow_max: f64) -> Self {
        if percent_error.is_nan() {
            ErrorBand::Unscored
        } else if percent_error <= green_max {
            ErrorBand::Green
        } else if percent_error <= yellow_max {
            ErrorBand::Yellow
        } else {
            ErrorBand::Red
        }
    }
}

/// One held-out day scored against the truncated-history forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRow {
    pub date: NaiveDate,
    pub observed: f64,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
    pub absolute_error: f64,
    pub squared_error: f64,
    pub percent_error: f64,
    pub band: ErrorBand,
}

impl ValidationRow {
    /// Score `forecast` against `observed`.
    ///
    /// Percent error is relative to the observed count, so days observed at
    /// zero or below are left `Unscored` with a NaN percent error.
    pub fn score(
        date: NaiveDate,
        observed: f64,
        forecast: f64,
        (lower, upper): (f64, f64),
        (green_max, yellow_max): (f64, f64),
    ) -> Self {
        let error = forecast - observed;
        let absolute_error = error.abs();
        let percent_error = if observed > 0.0 {
            100.0 * absolute_error / observed
        } else {
            f64::NAN
        };
        Self {
            date,
            observed,
            forecast,
            lower,
            upper,
            absolute_error,
            squared_error: error * error,
            percent_error,
            band: ErrorBand::classify(percent_error, green_max, yellow_max),
        }
    }

    /// Whether the observed value lies inside the forecast interval.
    pub fn covered(&self) -> bool {
        self.lower <= self.observed && self.observed <= self.upper
    }
}

/// Rows strictly after the validation cutoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationTable {
    pub metric: String,
    pub cutoff: NaiveDate,
    pub confidence_level: f64,
    pub rows: Vec<ValidationRow>,
}

/// Aggregate accuracy over a validation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub horizon: usize,
    pub mae: f64,
    pub rmse: f64,
    pub mape: Option<f64>,
    pub smape: f64,
    pub r_squared: f64,
    /// Share of held-out days inside the forecast interval.
    pub coverage: f64,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub unscored: usize,
}

impl ValidationTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count(&self, band: ErrorBand) -> usize {
        self.rows.iter().filter(|r| r.band == band).count()
    }

    pub fn summary(&self) -> ValidationSummary {
        let observed: Vec<f64> = self.rows.iter().map(|r| r.observed).collect();
        let forecast: Vec<f64> = self.rows.iter().map(|r| r.forecast).collect();
        let AccuracyMetrics { mae, rmse, mape, smape, r_squared, .. } =
            calculate_metrics(&observed, &forecast).unwrap_or_else(|_| AccuracyMetrics::undefined());

        let coverage = if self.rows.is_empty() {
            f64::NAN
        } else {
            self.rows.iter().filter(|r| r.covered()).count() as f64 / self.rows.len() as f64
        };

        ValidationSummary {
            horizon: self.rows.len(),
            mae,
            rmse,
            mape,
            smape,
            r_squared,
            coverage,
            green: self.count(ErrorBand::Green),
            yellow: self.count(ErrorBand::Yellow),
            red: self.count(ErrorBand::Red),
            unscored: self.count(ErrorBand::Unscored),
        }
    }
}
