//! Daily metric store: aggregation, gap filling, anomaly diagnostics and patching.

use crate::core::series::{date_range, DailySeries};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single raw reading of the metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// A reading stamped at midnight of `date`.
    pub fn daily(date: NaiveDate, value: f64) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN), value)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A day whose value jumped sharply relative to the previous day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    /// Absolute fractional change over the previous day (0.5 = 50%).
    pub magnitude: f64,
}

/// Owns the daily series of one metric.
///
/// The series always covers `[first_observed_date, last_observed_date]`
/// without gaps; days with no readings are filled with the mean of the raw
/// readings at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStore {
    metric: String,
    series: DailySeries,
    first_observed: NaiveDate,
    last_observed: NaiveDate,
}

impl SeriesStore {
    /// Aggregate raw readings into one mean value per day and fill gaps.
    ///
    /// Readings outside `[min_date, max_date]` are dropped before the
    /// observed range is recorded. Non-finite readings are ignored.
    pub fn load(
        observations: &[Observation],
        metric: impl Into<String>,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
    ) -> Result<Self> {
        let metric = metric.into();

        let valid: Vec<&Observation> = observations
            .iter()
            .filter(|o| o.value.is_finite())
            .collect();
        if valid.is_empty() {
            return Err(ForecastError::Config(format!(
                "no observations for metric '{metric}'"
            )));
        }
        let fill_value = valid.iter().map(|o| o.value).sum::<f64>() / valid.len() as f64;

        let mut daily: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for obs in valid {
            let date = obs.date();
            if min_date.is_some_and(|min| date < min) || max_date.is_some_and(|max| date > max) {
                continue;
            }
            let entry = daily.entry(date).or_insert((0.0, 0));
            entry.0 += obs.value;
            entry.1 += 1;
        }

        let (first_observed, last_observed) =
            match (daily.keys().next(), daily.keys().next_back()) {
                (Some(&first), Some(&last)) => (first, last),
                _ => {
                    return Err(ForecastError::Config(format!(
                        "no observations for metric '{metric}' between {} and {}",
                        min_date.map_or("-".to_string(), |d| d.to_string()),
                        max_date.map_or("-".to_string(), |d| d.to_string()),
                    )))
                }
            };

        let values: Vec<f64> = date_range(first_observed, last_observed)
            .map(|date| {
                daily
                    .get(&date)
                    .map_or(fill_value, |(sum, count)| sum / *count as f64)
            })
            .collect();

        let filled = values.len() - daily.len();
        if filled > 0 {
            log::info!("Imputed {filled} missing days of '{metric}' with mean {fill_value:.3}");
        }

        Ok(Self {
            metric,
            series: DailySeries::new(first_observed, values),
            first_observed,
            last_observed,
        })
    }

    /// Wrap an already contiguous daily series.
    pub fn from_series(metric: impl Into<String>, series: DailySeries) -> Result<Self> {
        let metric = metric.into();
        let last_observed = series
            .end()
            .ok_or_else(|| ForecastError::Config(format!("empty series for metric '{metric}'")))?;
        Ok(Self {
            metric,
            first_observed: series.start(),
            last_observed,
            series,
        })
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn series(&self) -> &DailySeries {
        &self.series
    }

    pub fn first_observed_date(&self) -> NaiveDate {
        self.first_observed
    }

    pub fn last_observed_date(&self) -> NaiveDate {
        self.last_observed
    }

    /// Number of days between the first and last observed dates, inclusive.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Days whose absolute day-over-day change exceeds `threshold`,
    /// largest change first.
    pub fn detect_anomalies(&self, threshold: f64) -> Vec<Anomaly> {
        let values = self.series.values();
        let mut anomalies: Vec<Anomaly> = values
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| {
                let magnitude = ((w[1] - w[0]) / w[0]).abs();
                (!magnitude.is_nan() && magnitude > threshold).then(|| Anomaly {
                    date: self.series.date_at(i + 1),
                    magnitude,
                })
            })
            .collect();

        anomalies.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));

        if !anomalies.is_empty() {
            log::info!(
                "Found {} anomalous days in '{}' (threshold {threshold})",
                anomalies.len(),
                self.metric
            );
            for a in &anomalies {
                log::info!("  {}: {:.1}% change over previous day", a.date, 100.0 * a.magnitude);
            }
        }

        anomalies
    }

    /// Overwrite `[first_date, last_date]` by linear interpolation between the
    /// days on either side of the interval.
    ///
    /// Interpolated values are truncated to integers since the metric is a count.
    pub fn patch(&mut self, first_date: NaiveDate, last_date: NaiveDate) -> Result<()> {
        if first_date > last_date {
            return Err(ForecastError::Config(format!(
                "patch start {first_date} is after patch end {last_date}"
            )));
        }

        let before = first_date - Duration::days(1);
        let after = last_date + Duration::days(1);
        let left = self.bracket_value(before)?;
        let right = self.bracket_value(after)?;

        let num_days = (last_date - first_date).num_days() as usize + 1;
        let step = (right - left) / (num_days + 1) as f64;

        let start = self
            .series
            .index_of(first_date)
            .ok_or(ForecastError::OutOfRange {
                date: first_date,
                first: self.first_observed,
                last: Some(self.last_observed),
            })?;
        for (k, slot) in self.series.values_mut()[start..start + num_days]
            .iter_mut()
            .enumerate()
        {
            *slot = (left + step * (k + 1) as f64).trunc();
        }

        log::info!(
            "Patched {num_days} days of '{}' from {first_date} to {last_date}",
            self.metric
        );
        Ok(())
    }

    fn bracket_value(&self, date: NaiveDate) -> Result<f64> {
        self.series.get(date).ok_or(ForecastError::OutOfRange {
            date,
            first: self.first_observed,
            last: Some(self.last_observed),
        })
    }

    /// Replace every non-positive value with `value` so Box-Cox is defined.
    ///
    /// Returns the number of days changed.
    pub fn bump_zeros(&mut self, value: f64) -> usize {
        let mut bumped = 0;
        for slot in self.series.values_mut() {
            if *slot <= 0.0 {
                *slot = value;
                bumped += 1;
            }
        }
        if bumped > 0 {
            log::info!("Bumped {bumped} non-positive days of '{}' to {value}", self.metric);
        }
        bumped
    }

    /// Independent copy restricted to days up to and including `cutoff`.
    pub fn truncated(&self, cutoff: NaiveDate) -> Result<SeriesStore> {
        if cutoff < self.first_observed {
            return Err(ForecastError::Config(format!(
                "cutoff {cutoff} precedes first observed date {}",
                self.first_observed
            )));
        }
        let series = self.series.through(cutoff);
        let last_observed = series.end().unwrap_or(self.first_observed);
        Ok(Self {
            metric: self.metric.clone(),
            series,
            first_observed: self.first_observed,
            last_observed,
        })
    }
}
