// radar_core/src/estimation/mod.rs

pub mod kalman;
pub mod range;

pub use kalman::{FilterState, ScalarKalmanFilter};
pub use range::{usable_sample, RangeEstimator};
