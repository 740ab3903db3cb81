//! Global trend: a power-law linear branch over the observed range and a
//! logistic branch beyond it.
//!
//! Both branches work in Box-Cox space. The logistic branch is anchored at
//! `last_observed_date` so that its value and first derivative match the
//! linear branch there; its asymptote is the carrying capacity transformed
//! with the same lambda.

use crate::core::{date_range, DailySeries};
use crate::error::{ForecastError, Result};
use crate::transform::boxcox_value;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Parameters learned by the transform learner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendParameters {
    pub box_cox_lambda: f64,
    pub global_slope: f64,
    pub global_intercept: f64,
    pub trend_exponent: f64,
    /// Ceiling in raw metric space.
    pub carrying_capacity: f64,
}

/// `slope * position^exponent + intercept`, valid on `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBranch {
    slope: f64,
    intercept: f64,
    exponent: f64,
    first: NaiveDate,
    last: NaiveDate,
}

impl LinearBranch {
    pub fn new(params: &TrendParameters, first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            slope: params.global_slope,
            intercept: params.global_intercept,
            exponent: params.trend_exponent,
            first,
            last,
        }
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    /// Days since the first observed date.
    pub fn position(&self, date: NaiveDate) -> f64 {
        (date - self.first).num_days() as f64
    }

    pub fn value_at_position(&self, position: f64) -> f64 {
        self.slope * position.powf(self.exponent) + self.intercept
    }

    /// First derivative with respect to position.
    pub fn slope_at_position(&self, position: f64) -> f64 {
        if self.exponent == 1.0 {
            self.slope
        } else {
            self.slope * self.exponent * position.powf(self.exponent - 1.0)
        }
    }

    fn check(&self, date: NaiveDate) -> Result<()> {
        if date < self.first || date > self.last {
            return Err(ForecastError::OutOfRange {
                date,
                first: self.first,
                last: Some(self.last),
            });
        }
        Ok(())
    }

    pub fn value(&self, date: NaiveDate) -> Result<f64> {
        self.check(date)?;
        Ok(self.value_at_position(self.position(date)))
    }

    /// Evaluate over `[from, to]`; both ends must be inside the branch.
    pub fn evaluate(&self, from: NaiveDate, to: NaiveDate) -> Result<DailySeries> {
        self.check(from)?;
        self.check(to)?;
        let values = date_range(from, to)
            .map(|d| self.value_at_position(self.position(d)))
            .collect();
        Ok(DailySeries::new(from, values))
    }
}

/// `Y(x) = K V0 / (V0 + (K - V0) e^{-r x})`, with `x` the days after `anchor`.
///
/// Valid strictly after the anchor date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticBranch {
    capacity: f64,
    anchor_value: f64,
    rate: f64,
    anchor: NaiveDate,
}

impl LogisticBranch {
    /// Continue `linear` past its last date towards `carrying_capacity`.
    pub fn from_linear(linear: &LinearBranch, carrying_capacity: f64, lambda: f64) -> Result<Self> {
        let capacity = boxcox_value(carrying_capacity, lambda).map_err(|_| {
            ForecastError::InvalidParameter(format!(
                "carrying capacity {carrying_capacity} has no Box-Cox value"
            ))
        })?;
        let position = linear.position(linear.last());
        let anchor_value = linear.value_at_position(position);
        let anchor_slope = linear.slope_at_position(position);

        if !(anchor_value > 0.0 && anchor_value < capacity) {
            return Err(ForecastError::InvalidParameter(format!(
                "trend value {anchor_value:.6} at {} must lie in (0, {capacity:.6}) \
                 for logistic extrapolation; raise the carrying capacity",
                linear.last()
            )));
        }

        let rate = capacity * anchor_slope / ((capacity - anchor_value) * anchor_value);
        if !rate.is_finite() {
            return Err(ForecastError::InvalidParameter(format!(
                "logistic growth rate is not finite (slope {anchor_slope})"
            )));
        }

        Ok(Self {
            capacity,
            anchor_value,
            rate,
            anchor: linear.last(),
        })
    }

    /// Asymptote in Box-Cox space.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn anchor_value(&self) -> f64 {
        self.anchor_value
    }

    pub fn value_at_offset(&self, x: f64) -> f64 {
        let k = self.capacity;
        let v0 = self.anchor_value;
        k * v0 / (v0 + (k - v0) * (-self.rate * x).exp())
    }

    fn first_valid(&self) -> NaiveDate {
        self.anchor + Duration::days(1)
    }

    fn check(&self, date: NaiveDate) -> Result<()> {
        if date <= self.anchor {
            return Err(ForecastError::OutOfRange {
                date,
                first: self.first_valid(),
                last: None,
            });
        }
        Ok(())
    }

    pub fn value(&self, date: NaiveDate) -> Result<f64> {
        self.check(date)?;
        Ok(self.value_at_offset((date - self.anchor).num_days() as f64))
    }

    /// Evaluate over `[from, to]`; `from` must be after the anchor.
    pub fn evaluate(&self, from: NaiveDate, to: NaiveDate) -> Result<DailySeries> {
        self.check(from)?;
        let values = date_range(from, to)
            .map(|d| self.value_at_offset((d - self.anchor).num_days() as f64))
            .collect();
        Ok(DailySeries::new(from, values))
    }
}

/// One branch of the piecewise trend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrendBranch {
    Linear(LinearBranch),
    Logistic(LogisticBranch),
}

impl TrendBranch {
    pub fn value(&self, date: NaiveDate) -> Result<f64> {
        match self {
            TrendBranch::Linear(b) => b.value(date),
            TrendBranch::Logistic(b) => b.value(date),
        }
    }

    pub fn evaluate(&self, from: NaiveDate, to: NaiveDate) -> Result<DailySeries> {
        match self {
            TrendBranch::Linear(b) => b.evaluate(from, to),
            TrendBranch::Logistic(b) => b.evaluate(from, to),
        }
    }
}

/// Piecewise trend over `[first, ..)`, linear up to `last` and logistic after.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTrend {
    params: TrendParameters,
    linear: LinearBranch,
}

impl GlobalTrend {
    pub fn new(params: TrendParameters, first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            params,
            linear: LinearBranch::new(&params, first, last),
        }
    }

    pub fn params(&self) -> &TrendParameters {
        &self.params
    }

    pub fn linear(&self) -> &LinearBranch {
        &self.linear
    }

    /// Build the logistic continuation. Fails if the anchor is not below
    /// the transformed carrying capacity.
    pub fn logistic(&self) -> Result<LogisticBranch> {
        LogisticBranch::from_linear(
            &self.linear,
            self.params.carrying_capacity,
            self.params.box_cox_lambda,
        )
    }

    /// The branch responsible for `date`.
    pub fn branch_for(&self, date: NaiveDate) -> Result<TrendBranch> {
        if date <= self.linear.last() {
            Ok(TrendBranch::Linear(self.linear))
        } else {
            self.logistic().map(TrendBranch::Logistic)
        }
    }

    pub fn value(&self, date: NaiveDate) -> Result<f64> {
        self.branch_for(date)?.value(date)
    }

    /// Evaluate over `[from, to]`, splitting at the last observed date.
    pub fn evaluate(&self, from: NaiveDate, to: NaiveDate) -> Result<DailySeries> {
        if from > to {
            return Ok(DailySeries::new(from, Vec::new()));
        }
        let last = self.linear.last();
        if to <= last {
            return self.linear.evaluate(from, to);
        }
        let logistic = self.logistic()?;
        if from > last {
            return logistic.evaluate(from, to);
        }

        let mut values = self.linear.evaluate(from, last)?.into_values();
        values.extend(logistic.evaluate(last + Duration::days(1), to)?.into_values());
        Ok(DailySeries::new(from, values))
    }

    /// Evaluate over the dates covered by `series`.
    pub fn evaluate_like(&self, series: &DailySeries) -> Result<DailySeries> {
        match series.end() {
            Some(end) => self.evaluate(series.start(), end),
            None => Ok(DailySeries::new(series.start(), Vec::new())),
        }
    }
}
