//! Derived values shown next to the raw readings.
mod forecast;
mod occupancy;
mod warnings;

pub use forecast::{forecast, ForecastPoint};
pub use occupancy::estimate_occupancy;
pub use warnings::{check, check_occupancy, Level, Warning};
