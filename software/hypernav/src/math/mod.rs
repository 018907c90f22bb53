//! Calibration math feeding the acquisition engine. Everything here is pure.

mod polynomial;
pub mod pressure;
pub mod solar;
pub mod stats;
pub mod tilt;

pub use polynomial::polyval;
pub use pressure::{PressureCoefficients, PressureReading};
pub use solar::{SolarPosition, solar_position};
pub use stats::{CircularStats, PixelStats, RunningStats};
pub use tilt::{AccelCalibration, Attitude, MagCalibration};
