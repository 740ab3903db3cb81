//! Data transformations for daily series.
//!
//! Provides the Box-Cox power transform and centered rolling means.
//!
//! # Example
//!
//! ```
//! use decomp_arima::transform::{boxcox, inv_boxcox, rolling_mean};
//!
//! let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//!
//! let bc = boxcox(&series, 0.5).unwrap();
//! let back = inv_boxcox(&bc, 0.5).unwrap();
//! assert!((back[3] - 4.0).abs() < 1e-9);
//!
//! // Centered weekly mean, incomplete windows dropped
//! let rm = rolling_mean(&series, 7).unwrap();
//! assert_eq!(rm.len(), 2);
//! ```

pub mod boxcox;
pub mod window;

pub use boxcox::{
    boxcox, boxcox_lambda, boxcox_value, inv_boxcox, inv_boxcox_value,
};
pub use window::{rolling_mean, rolling_mean_daily};
