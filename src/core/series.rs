//! Contiguous daily series.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A date-indexed series with exactly one value per calendar day.
///
/// The series is stored as a start date plus a dense vector, so dates are
/// unique, sorted and gap-free by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailySeries {
    /// Create a series starting at `start`, one value per following day.
    pub fn new(start: NaiveDate, values: Vec<f64>) -> Self {
        Self { start, values }
    }

    /// Create a series of `len` copies of `value`.
    pub fn constant(start: NaiveDate, len: usize, value: f64) -> Self {
        Self::new(start, vec![value; len])
    }

    /// Build a series from `(date, value)` pairs.
    ///
    /// The pairs must already be sorted and cover consecutive days.
    pub fn from_pairs(pairs: &[(NaiveDate, f64)]) -> Result<Self> {
        let (start, _) = *pairs
            .first()
            .ok_or_else(|| ForecastError::Config("no dated values supplied".into()))?;

        for (offset, (date, _)) in pairs.iter().enumerate() {
            let expected = start + Duration::days(offset as i64);
            if *date != expected {
                return Err(ForecastError::Config(format!(
                    "series is not contiguous: expected {expected}, found {date}"
                )));
            }
        }

        Ok(Self::new(start, pairs.iter().map(|(_, v)| *v).collect()))
    }

    /// Number of days covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First covered date.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last covered date, `None` for an empty series.
    pub fn end(&self) -> Option<NaiveDate> {
        if self.is_empty() {
            None
        } else {
            Some(self.start + Duration::days(self.len() as i64 - 1))
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Date of the value at `index`.
    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }

    /// Position of `date` in the series, if covered.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        if offset < 0 || offset as usize >= self.len() {
            None
        } else {
            Some(offset as usize)
        }
    }

    /// Value on `date`, if covered.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).map(|i| self.values[i])
    }

    /// Whether `date` falls inside the covered range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of(date).is_some()
    }

    /// Iterate over covered dates.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len()).map(move |i| self.date_at(i))
    }

    /// Iterate over `(date, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.date_at(i), v))
    }

    /// Copy of the closed interval `[from, to]`.
    ///
    /// Both ends must be covered by the series.
    pub fn slice(&self, from: NaiveDate, to: NaiveDate) -> Result<DailySeries> {
        if from > to {
            return Err(ForecastError::Config(format!(
                "slice start {from} is after slice end {to}"
            )));
        }
        let lo = self.index_of(from).ok_or(ForecastError::OutOfRange {
            date: from,
            first: self.start,
            last: self.end(),
        })?;
        let hi = self.index_of(to).ok_or(ForecastError::OutOfRange {
            date: to,
            first: self.start,
            last: self.end(),
        })?;
        Ok(Self::new(from, self.values[lo..=hi].to_vec()))
    }

    /// Copy of every day up to and including `cutoff`.
    ///
    /// Returns an empty series when `cutoff` precedes the start.
    pub fn through(&self, cutoff: NaiveDate) -> DailySeries {
        let keep = ((cutoff - self.start).num_days() + 1).clamp(0, self.len() as i64) as usize;
        Self::new(self.start, self.values[..keep].to_vec())
    }

    /// Apply `f` to every value.
    pub fn map<F>(&self, f: F) -> DailySeries
    where
        F: Fn(f64) -> f64,
    {
        Self::new(self.start, self.values.iter().map(|&v| f(v)).collect())
    }

    /// Combine two series covering exactly the same dates.
    pub fn zip_with<F>(&self, other: &DailySeries, f: F) -> Result<DailySeries>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.len() != other.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        if !self.is_empty() && self.start != other.start {
            return Err(ForecastError::Config(format!(
                "series start on different dates: {} and {}",
                self.start, other.start
            )));
        }
        Ok(Self::new(
            self.start,
            self.values
                .iter()
                .zip(other.values.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        ))
    }

    /// Element-wise `self + other`.
    pub fn plus(&self, other: &DailySeries) -> Result<DailySeries> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise `self - other`.
    pub fn minus(&self, other: &DailySeries) -> Result<DailySeries> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Arithmetic mean (NaN when empty).
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.len() as f64
    }

    /// Largest value (NaN when empty).
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NAN, f64::max)
    }
}

/// Iterate over the closed date range `[first, last]`.
pub fn date_range(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let days = (last - first).num_days().max(-1) + 1;
    (0..days).map(move |i| first + Duration::days(i))
}
