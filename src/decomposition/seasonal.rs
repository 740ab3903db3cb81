//! Annual seasonal profile: Fourier filtering and month-day tiling.

use crate::core::{date_range, DailySeries};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Calendar month and day, ignoring the year. Feb-29 is a valid key.
///
/// Serialized as `"MM-DD"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        // 2000 is a leap year, so every month-day is representable.
        NaiveDate::from_ymd_opt(2000, month, day)
            .map(Self::of)
            .ok_or_else(|| ForecastError::Config(format!("invalid month-day {month:02}-{day:02}")))
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: Option<&str>| part.and_then(|p| p.trim().parse::<u32>().ok());
        let mut parts = s.split('-');
        match (parse(parts.next()), parse(parts.next()), parts.next()) {
            (Some(month), Some(day), None) => Self::new(month, day),
            _ => Err(ForecastError::Config(format!("expected MM-DD, got {s:?}"))),
        }
    }
}

impl From<MonthDay> for String {
    fn from(key: MonthDay) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthDay {
    type Error = ForecastError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Seasonal offset per month-day, learned from one calendar year.
///
/// Lookups for month-days absent from the profile (Feb-29 when the reference
/// year is not a leap year, or days outside a partial reference year) fall
/// back to the nearest preceding month-day that is present, wrapping from
/// January back to December.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    reference_year: i32,
    offsets: BTreeMap<MonthDay, f64>,
}

impl SeasonalProfile {
    /// Key each value of `series` by its month-day.
    ///
    /// The series must lie within a single calendar year.
    pub fn from_series(series: &DailySeries) -> Result<Self> {
        let end = series.end().ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;
        let reference_year = series.start().year();
        if end.year() != reference_year {
            return Err(ForecastError::Config(format!(
                "seasonal profile must come from one calendar year, got {} to {end}",
                series.start()
            )));
        }

        let offsets = series.iter().map(|(date, v)| (MonthDay::of(date), v)).collect();
        Ok(Self {
            reference_year,
            offsets,
        })
    }

    /// The calendar year the profile was learned from.
    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Exact offset for `key`, without fallback.
    pub fn get(&self, key: MonthDay) -> Option<f64> {
        self.offsets.get(&key).copied()
    }

    /// Offset for `date` using the preceding-day fallback.
    pub fn resolve(&self, date: NaiveDate) -> f64 {
        let key = MonthDay::of(date);
        self.offsets
            .range(..=key)
            .next_back()
            .or_else(|| self.offsets.iter().next_back())
            .map_or(0.0, |(_, &v)| v)
    }

    /// Tile the profile over `[first, last]`.
    pub fn tile(&self, first: NaiveDate, last: NaiveDate) -> DailySeries {
        DailySeries::new(first, date_range(first, last).map(|d| self.resolve(d)).collect())
    }

    /// Tile the profile over the dates covered by `series`.
    pub fn tile_like(&self, series: &DailySeries) -> DailySeries {
        DailySeries::new(series.start(), series.dates().map(|d| self.resolve(d)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonthDay, f64)> + '_ {
        self.offsets.iter().map(|(k, v)| (*k, *v))
    }
}

/// Keep only the dominant low-frequency Fourier components of `values`.
///
/// Components above index `cutoff` are zeroed, then all but the
/// `num_components` largest-magnitude survivors are zeroed. The result is the
/// real part of the inverse transform (normalized by `1/n`).
pub fn fourier_filter(values: &[f64], cutoff: usize, num_components: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || num_components == 0 {
        return vec![0.0; n];
    }

    let mut buffer: Vec<Complex64> = values.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    for z in buffer.iter_mut().skip(cutoff + 1) {
        *z = Complex64::new(0.0, 0.0);
    }

    // Stable ascending sort: among equal magnitudes the higher index ranks higher.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| buffer[a].norm().total_cmp(&buffer[b].norm()));
    for &idx in order.iter().take(n.saturating_sub(num_components)) {
        buffer[idx] = Complex64::new(0.0, 0.0);
    }

    planner.plan_fft_inverse(n).process(&mut buffer);
    buffer.iter().map(|z| z.re / n as f64).collect()
}

/// Learn the seasonal profile from detrended data.
///
/// Uses the calendar year before the last year present in `detrended`,
/// which may be partial if the data starts mid-year.
pub fn fourier_seasonal_profile(
    detrended: &DailySeries,
    cutoff: usize,
    num_components: usize,
) -> Result<SeasonalProfile> {
    let last = detrended
        .end()
        .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;
    let year = last.year() - 1;

    let first_of_year = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ForecastError::Config(format!("year {year} out of range")))?;
    let last_of_year = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| ForecastError::Config(format!("year {year} out of range")))?;

    let from = first_of_year.max(detrended.start());
    if from > last_of_year {
        return Err(ForecastError::InsufficientData {
            needed: 1,
            got: 0,
        });
    }
    let year_data = detrended.slice(from, last_of_year)?;

    log::debug!(
        "Seasonal reference year {year}: {} days, {num_components} Fourier components below index {cutoff}",
        year_data.len()
    );

    let filtered = fourier_filter(year_data.values(), cutoff, num_components);
    SeasonalProfile::from_series(&DailySeries::new(year_data.start(), filtered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_day_validation_and_display() {
        assert!(MonthDay::new(2, 29).is_ok());
        assert!(MonthDay::new(2, 30).is_err());
        assert!(MonthDay::new(13, 1).is_err());
        assert_eq!(MonthDay::of(date(2023, 7, 4)).to_string(), "07-04");
        assert!(MonthDay::new(1, 31).unwrap() < MonthDay::new(2, 1).unwrap());
        assert_eq!("02-29".parse::<MonthDay>().unwrap(), MonthDay::new(2, 29).unwrap());
        assert!("02-30".parse::<MonthDay>().is_err());
        assert!("1-2-3".parse::<MonthDay>().is_err());
    }

    #[test]
    fn profile_serializes_with_month_day_keys() {
        let profile =
            SeasonalProfile::from_series(&DailySeries::new(date(2023, 12, 30), vec![1.5, -0.5])).unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        assert_eq!(json, r#"{"reference_year":2023,"offsets":{"12-30":1.5,"12-31":-0.5}}"#);
        let back: SeasonalProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn fourier_filter_keeps_dominant_low_frequency() {
        let n = 365;
        let values: Vec<f64> = (0..n)
            .map(|t| {
                let x = 2.0 * PI * t as f64 / n as f64;
                3.0 * x.cos() + 0.2 * (52.0 * x).sin()
            })
            .collect();

        let filtered = fourier_filter(&values, 12, 1);
        // Only bin 1 survives; its conjugate (bin n-1) is above the cutoff.
        for (t, f) in filtered.iter().enumerate() {
            let x = 2.0 * PI * t as f64 / n as f64;
            assert_relative_eq!(*f, 1.5 * x.cos(), epsilon = 1e-9);
        }
    }

    #[test]
    fn fourier_filter_zero_components_is_flat() {
        let values = vec![1.0, 5.0, -2.0, 4.0];
        assert_eq!(fourier_filter(&values, 12, 0), vec![0.0; 4]);
        assert!(fourier_filter(&[], 12, 3).is_empty());
    }

    #[test]
    fn fourier_filter_all_components_below_cutoff_reproduce_input() {
        // With n <= cutoff + 1 and enough components nothing is removed.
        let values = vec![1.0, 5.0, -2.0, 4.0, 0.5];
        let filtered = fourier_filter(&values, 12, 5);
        for (a, b) in values.iter().zip(filtered.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn profile_uses_previous_calendar_year() {
        let start = date(2021, 6, 1);
        let last = date(2023, 3, 1);
        let len = (last - start).num_days() as usize + 1;
        let detrended = DailySeries::new(start, (0..len).map(|i| (i as f64 * 0.05).sin()).collect());

        let profile = fourier_seasonal_profile(&detrended, 12, 3).unwrap();
        assert_eq!(profile.reference_year(), 2022);
        assert_eq!(profile.len(), 365);
        assert!(profile.get(MonthDay::new(2, 29).unwrap()).is_none());
    }

    #[test]
    fn profile_rejects_missing_reference_year() {
        let detrended = DailySeries::new(date(2023, 1, 5), vec![1.0; 30]);
        assert!(matches!(
            fourier_seasonal_profile(&detrended, 12, 3),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn leap_day_takes_feb_28_value() {
        let year = DailySeries::new(date(2023, 1, 1), (0..365).map(|i| i as f64).collect());
        let profile = SeasonalProfile::from_series(&year).unwrap();

        let feb28 = profile.resolve(date(2024, 2, 28));
        assert_eq!(profile.resolve(date(2024, 2, 29)), feb28);
        assert_eq!(profile.resolve(date(2024, 3, 1)), feb28 + 1.0);

        let tiled = profile.tile(date(2024, 2, 27), date(2024, 3, 1));
        assert_eq!(tiled.values(), &[57.0, 58.0, 58.0, 59.0]);
    }

    #[test]
    fn partial_profile_wraps_to_december() {
        // Reference year covers only Jun-Dec.
        let partial = DailySeries::new(date(2022, 6, 1), (0..214).map(|i| i as f64).collect());
        let profile = SeasonalProfile::from_series(&partial).unwrap();

        let dec31 = profile.resolve(date(2022, 12, 31));
        assert_relative_eq!(dec31, 213.0);
        assert_relative_eq!(profile.resolve(date(2023, 1, 15)), dec31);
        assert_relative_eq!(profile.resolve(date(2023, 6, 1)), 0.0);
    }

    #[test]
    fn profile_requires_single_year() {
        let span = DailySeries::new(date(2022, 12, 30), vec![0.0; 5]);
        assert!(matches!(
            SeasonalProfile::from_series(&span),
            Err(ForecastError::Config(_))
        ));
    }
}
