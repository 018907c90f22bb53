//! Interfaces to the spectrometer-board hardware used by the acquisition engine.
//!
//! Each collaborator is an object-safe trait so that the engine can run
//! against the board drivers or against [`mockup::SimulatedBoard`].

use core::fmt::Debug;

use hypernav_shared::Side;

pub mod mockup;
mod pressure;
pub mod retry;

pub use mockup::{BoardEvent, SimulatedBoard};
pub use pressure::{
    PeriodReading, PressureChannel, PressureInput, PressureSample, PressureSensor, PressureSource,
};

/// Shutter actuators for both spectrometers.
///
/// `open` and `close` return once the actuation pulse and its settle delay
/// have completed.
pub trait Shutter: Send {
    fn open(&mut self, side: Side) -> Result<(), String>;
    fn close(&mut self, side: Side) -> Result<(), String>;

    /// Remove drive power from both shutters
    fn power_off(&mut self);
}

/// Fill level of a spectrometer FIFO
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FifoLevel {
    Empty,
    Partial,
    HalfFull,
    Full,
}

/// Spectrometer readout electronics: power, sampling bursts, and the
/// pixel FIFO that buffers each readout.
pub trait SpectrometerFifo: Send {
    fn set_power(&mut self, side: Side, on: bool) -> Result<(), String>;

    /// Begin a burst of `clearouts` discarded readouts followed by `samples`
    /// readouts, each integrating for `integration_ms`.
    fn start_capture(
        &mut self,
        side: Side,
        integration_ms: u16,
        clearouts: u16,
        samples: u16,
    ) -> Result<(), String>;

    /// Number of complete readouts waiting in the FIFO
    fn spectra_available(&mut self, side: Side) -> u16;

    fn level(&mut self, side: Side) -> FifoLevel;

    /// Next word in the FIFO, or `None` if it is empty
    fn pop_pixel(&mut self, side: Side) -> Option<u16>;

    /// Clear the FIFO and readout counter ahead of the next burst
    fn rearm(&mut self, side: Side);

    /// Detector temperature in degrees C
    fn temperature(&mut self, side: Side) -> Result<f64, String>;

    fn is_empty(&mut self, side: Side) -> bool {
        self.level(side) == FifoLevel::Empty
    }

    fn is_half_full(&mut self, side: Side) -> bool {
        matches!(self.level(side), FifoLevel::HalfFull | FifoLevel::Full)
    }

    fn is_full(&mut self, side: Side) -> bool {
        self.level(side) == FifoLevel::Full
    }
}

/// Raw accelerometer and magnetometer access
pub trait TiltHeading: Send {
    /// Accelerometer counts averaged over `n_avg` readings
    fn accel_raw(&mut self, n_avg: u16) -> Result<[f64; 3], String>;

    /// Magnetometer counts averaged over `n_avg` readings
    fn mag_raw(&mut self, n_avg: u16) -> Result<[f64; 3], String>;
}

/// Everything the acquisition engine drives
pub struct Hardware {
    pub shutter: Box<dyn Shutter>,
    pub spectrometer: Box<dyn SpectrometerFifo>,
    pub tilt: Box<dyn TiltHeading>,
    pub pressure: PressureSource,
}

impl Debug for Hardware {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hardware")
            .field("pressure", &self.pressure)
            .finish_non_exhaustive()
    }
}
