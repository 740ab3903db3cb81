//! Moves dated series between raw metric space and residual space.

use super::learner::LearnedTransforms;
use super::trend::GlobalTrend;
use crate::core::DailySeries;
use crate::error::Result;
use crate::transform::{boxcox, inv_boxcox};

/// Applies learned transforms in the fixed order
/// Box-Cox, trend, seasonality (and the reverse).
#[derive(Debug, Clone, Copy)]
pub struct SpaceConverter<'a> {
    learned: &'a LearnedTransforms,
    trend: GlobalTrend,
}

impl<'a> SpaceConverter<'a> {
    pub fn new(learned: &'a LearnedTransforms) -> Self {
        Self {
            learned,
            trend: learned.trend(),
        }
    }

    pub fn trend(&self) -> &GlobalTrend {
        &self.trend
    }

    pub fn box_cox_transform(&self, series: &DailySeries) -> Result<DailySeries> {
        let values = boxcox(series.values(), self.learned.params.box_cox_lambda)?;
        Ok(DailySeries::new(series.start(), values))
    }

    pub fn inv_box_cox_transform(&self, series: &DailySeries) -> Result<DailySeries> {
        let values = inv_boxcox(series.values(), self.learned.params.box_cox_lambda)?;
        Ok(DailySeries::new(series.start(), values))
    }

    /// Remove the trend evaluated over the series' dates.
    ///
    /// Fails with `OutOfRange` for dates before the first observed date.
    pub fn subtract_global_trend(&self, series: &DailySeries) -> Result<DailySeries> {
        series.minus(&self.trend.evaluate_like(series)?)
    }

    pub fn add_global_trend(&self, series: &DailySeries) -> Result<DailySeries> {
        series.plus(&self.trend.evaluate_like(series)?)
    }

    pub fn subtract_seasonality(&self, series: &DailySeries) -> Result<DailySeries> {
        series.minus(&self.learned.seasonal.tile_like(series))
    }

    pub fn add_seasonality(&self, series: &DailySeries) -> Result<DailySeries> {
        series.plus(&self.learned.seasonal.tile_like(series))
    }

    /// Raw metric values to residuals.
    pub fn to_residual_space(&self, series: &DailySeries) -> Result<DailySeries> {
        let transformed = self.box_cox_transform(series)?;
        let detrended = self.subtract_global_trend(&transformed)?;
        self.subtract_seasonality(&detrended)
    }

    /// Residuals back to raw metric values.
    pub fn to_raw_space(&self, series: &DailySeries) -> Result<DailySeries> {
        let seasonal = self.add_seasonality(series)?;
        let trended = self.add_global_trend(&seasonal)?;
        self.inv_box_cox_transform(&trended)
    }
}
