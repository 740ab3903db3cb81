//! Deterministic decomposition: Box-Cox, global trend and annual seasonality.
//!
//! Parameters are learned once by [`TransformLearner`] and applied through a
//! [`SpaceConverter`], which moves dated series between raw metric space and
//! the residual space the stochastic model is fit on.

mod converter;
pub mod learner;
pub mod seasonal;
pub mod trend;

pub use converter::SpaceConverter;
pub use learner::{LearnedTransforms, TransformLearner, TrendFit};
pub use seasonal::{fourier_filter, fourier_seasonal_profile, MonthDay, SeasonalProfile};
pub use trend::{GlobalTrend, LinearBranch, LogisticBranch, TrendBranch, TrendParameters};
