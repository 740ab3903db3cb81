//! Ordered learning of the deterministic components.
//!
//! Each step is a free function of the previous step's output:
//!
//! 1. [`rolling_average`] smooths the raw training series.
//! 2. [`estimate_carrying_capacity`] scales its maximum.
//! 3. [`resolve_box_cox_lambda`] fits (or takes) the Box-Cox lambda.
//! 4. [`fit_trend`] regresses the transformed average on `position^exponent`.
//! 5. [`learn_seasonality`] Fourier-filters one year of the detrended average.
//!
//! [`TransformLearner`] chains them from a [`PipelineConfig`].

use super::seasonal::{fourier_seasonal_profile, SeasonalProfile};
use super::trend::{GlobalTrend, TrendParameters};
use crate::config::{BoxCoxLambda, PipelineConfig};
use crate::core::{DailySeries, SeriesStore};
use crate::error::{ForecastError, Result};
use crate::transform::{boxcox, boxcox_lambda, rolling_mean_daily};
use crate::utils::{ols_fit, OlsSummary};
use chrono::NaiveDate;
use serde::Serialize;

/// Everything learned from a training series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnedTransforms {
    pub params: TrendParameters,
    pub seasonal: SeasonalProfile,
    pub first_observed: NaiveDate,
    pub last_observed: NaiveDate,
    pub trend_summary: OlsSummary,
}

impl LearnedTransforms {
    pub fn trend(&self) -> GlobalTrend {
        GlobalTrend::new(self.params, self.first_observed, self.last_observed)
    }
}

/// Result of the trend regression.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub summary: OlsSummary,
}

/// Step 1: centered rolling mean, dated by window centers.
pub fn rolling_average(raw: &DailySeries, window: usize) -> Result<DailySeries> {
    rolling_mean_daily(raw, window)
}

/// Step 2: `multiplier * max(rolling)`.
pub fn estimate_carrying_capacity(rolling: &DailySeries, multiplier: f64) -> Result<f64> {
    let max = rolling.max();
    if !max.is_finite() || max <= 0.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "cannot estimate carrying capacity from maximum {max}"
        )));
    }
    Ok(multiplier * max)
}

/// Step 3: the Box-Cox lambda.
///
/// A negative estimate is rejected so the caller can supply one manually.
pub fn resolve_box_cox_lambda(rolling: &DailySeries, mode: BoxCoxLambda) -> Result<f64> {
    match mode {
        BoxCoxLambda::Manual(Some(lambda)) => {
            log::info!("Using manually set Box-Cox lambda {lambda}");
            Ok(lambda)
        }
        BoxCoxLambda::Manual(None) => Err(ForecastError::InvalidParameter(
            "manual Box-Cox mode is set but no lambda was supplied".to_string(),
        )),
        BoxCoxLambda::Estimate => {
            let lambda = boxcox_lambda(rolling.values())?;
            if lambda < 0.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "estimated Box-Cox lambda {lambda:.4} is negative; set lambda manually"
                )));
            }
            Ok(lambda)
        }
    }
}

/// Step 4: OLS of `transformed` on `position^exponent`.
///
/// Positions count days since `first_observed`, so the intercept is the
/// trend value at the first observed date.
pub fn fit_trend(transformed: &DailySeries, first_observed: NaiveDate, exponent: f64) -> Result<TrendFit> {
    let x: Vec<f64> = transformed
        .dates()
        .map(|d| ((d - first_observed).num_days() as f64).powf(exponent))
        .collect();
    let fit = ols_fit(transformed.values(), &[("x1", x.as_slice())])?;
    Ok(TrendFit {
        slope: fit.coefficients[0],
        intercept: fit.intercept,
        summary: fit.summary,
    })
}

/// Step 5: seasonal profile of `transformed` with the trend removed.
pub fn learn_seasonality(
    transformed: &DailySeries,
    trend: &GlobalTrend,
    cutoff: usize,
    num_components: usize,
) -> Result<SeasonalProfile> {
    let detrended = transformed.minus(&trend.evaluate_like(transformed)?)?;
    fourier_seasonal_profile(&detrended, cutoff, num_components)
}

/// Runs the five learning steps in order.
#[derive(Debug, Clone)]
pub struct TransformLearner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> TransformLearner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn learn(&self, store: &SeriesStore) -> Result<LearnedTransforms> {
        let config = self.config;
        let first_observed = store.first_observed_date();
        let last_observed = store.last_observed_date();

        log::info!("Computing {}-day rolling average", config.rolling_window);
        let rolling = rolling_average(store.series(), config.rolling_window)?;

        log::info!("Computing carrying capacity");
        let carrying_capacity = match config.carrying_capacity {
            Some(capacity) => {
                log::info!("Using manually set carrying capacity {capacity}");
                capacity
            }
            None => estimate_carrying_capacity(&rolling, config.capacity_multiplier)?,
        };
        log::debug!("Carrying capacity: {carrying_capacity}");

        log::info!("Computing Box-Cox lambda");
        let lambda = resolve_box_cox_lambda(&rolling, config.box_cox)?;
        log::debug!("Box-Cox lambda: {lambda}");
        let transformed = DailySeries::new(rolling.start(), boxcox(rolling.values(), lambda)?);

        log::info!("Computing global trend");
        let fit = fit_trend(&transformed, first_observed, config.trend_exponent)?;
        log::debug!("Global slope: {}, intercept: {}", fit.slope, fit.intercept);

        let params = TrendParameters {
            box_cox_lambda: lambda,
            global_slope: fit.slope,
            global_intercept: fit.intercept,
            trend_exponent: config.trend_exponent,
            carrying_capacity,
        };
        let trend = GlobalTrend::new(params, first_observed, last_observed);

        log::info!("Computing seasonality");
        let seasonal = learn_seasonality(
            &transformed,
            &trend,
            config.fourier_cutoff,
            config.num_fourier_components,
        )?;
        log::debug!(
            "Seasonal profile from {} with {} days",
            seasonal.reference_year(),
            seasonal.len()
        );

        Ok(LearnedTransforms {
            params,
            seasonal,
            first_observed,
            last_observed,
            trend_summary: fit.summary,
        })
    }
}
