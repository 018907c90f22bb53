//! Pressure sensor interface and the tolerant reader the engine samples from.

use core::fmt::Debug;

use hypernav_shared::frame::pressure_flags;

use crate::math::{PressureCoefficients, PressureReading};
use crate::profile::SimulatedAscent;

/// Frequency-counter channels of the quartz pressure sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressureChannel {
    Temperature,
    Pressure,
}

/// Result of one gated period measurement
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeriodReading {
    pub period_us: f64,

    /// Oscillator cycles counted during the gate
    pub counts: u32,

    pub duration_ms: u32,
}

/// Frequency-counter access to the pressure sensor
pub trait PressureSensor: Send {
    fn start_measurement(&mut self, channel: PressureChannel) -> Result<(), String>;

    /// Period from the last completed gate on this channel
    fn period(&mut self, channel: PressureChannel) -> Result<PeriodReading, String>;

    /// Power down the sensor and release the counters
    fn stop(&mut self);
}

/// Where pressure values come from
pub enum PressureInput {
    None,
    Sensor {
        sensor: Box<dyn PressureSensor>,
        coefficients: PressureCoefficients,
    },
    Simulated(SimulatedAscent),
}

/// Pressure value handed to frame assembly, with provenance
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PressureSample {
    pub reading: PressureReading,

    /// See [`pressure_flags`]
    pub flags: u8,

    /// Whether any reading has succeeded since the source was started
    pub valid: bool,
}

/// Pressure reader that keeps the last good value when a read fails.
pub struct PressureSource {
    input: PressureInput,
    running: bool,
    last: Option<PressureReading>,
    stale: bool,
}

impl Debug for PressureSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match &self.input {
            PressureInput::None => "none",
            PressureInput::Sensor { .. } => "sensor",
            PressureInput::Simulated(_) => "simulated",
        };
        f.debug_struct("PressureSource")
            .field("input", &kind)
            .field("running", &self.running)
            .field("last", &self.last)
            .field("stale", &self.stale)
            .finish()
    }
}

impl PressureSource {
    pub fn new(input: PressureInput) -> Self {
        Self {
            input,
            running: false,
            last: None,
            stale: false,
        }
    }

    pub fn none() -> Self {
        Self::new(PressureInput::None)
    }

    pub fn sensor(sensor: Box<dyn PressureSensor>, coefficients: PressureCoefficients) -> Self {
        Self::new(PressureInput::Sensor {
            sensor,
            coefficients,
        })
    }

    pub fn simulated(model: SimulatedAscent) -> Self {
        Self::new(PressureInput::Simulated(model))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.input, PressureInput::Simulated(_))
    }

    /// Power up and start the first gate on both channels.
    /// Restarting a running source is a no-op.
    pub fn start(&mut self) -> Result<(), String> {
        if self.running {
            return Ok(());
        }
        match &mut self.input {
            PressureInput::None => return Ok(()),
            PressureInput::Sensor { sensor, .. } => {
                sensor.start_measurement(PressureChannel::Temperature)?;
                sensor.start_measurement(PressureChannel::Pressure)?;
            }
            PressureInput::Simulated(model) => model.reset(),
        }
        self.running = true;
        self.last = None;
        self.stale = false;
        Ok(())
    }

    pub fn stop(&mut self) {
        if let PressureInput::Sensor { sensor, .. } = &mut self.input {
            if self.running {
                sensor.stop();
            }
        }
        self.running = false;
    }

    /// Take a new reading. On failure the previous value is kept and
    /// marked stale, and the error is returned for reporting.
    pub fn update(&mut self) -> Result<PressureSample, String> {
        if !self.running {
            return Ok(self.latest());
        }

        let result = match &mut self.input {
            PressureInput::None => return Ok(self.latest()),
            PressureInput::Sensor {
                sensor,
                coefficients,
            } => read_sensor(sensor.as_mut(), coefficients),
            PressureInput::Simulated(model) => Ok(PressureReading {
                temperature_c: model.temperature_c,
                pressure_dbar: model.next_pressure(),
            }),
        };

        match result {
            Ok(reading) => {
                self.last = Some(reading);
                self.stale = false;
                Ok(self.latest())
            }
            Err(e) => {
                self.stale = true;
                Err(e)
            }
        }
    }

    /// Most recent value with provenance flags, without touching the sensor
    pub fn latest(&self) -> PressureSample {
        let mut flags = 0;
        if self.running {
            flags |= pressure_flags::SENSOR_RUNNING;
        }
        if self.stale {
            flags |= pressure_flags::STALE;
        }
        if self.is_simulated() {
            flags |= pressure_flags::SIMULATED;
        }

        PressureSample {
            reading: self.last.unwrap_or_default(),
            flags,
            valid: self.last.is_some(),
        }
    }
}

/// Read both periods, calibrate, and start the next gates
fn read_sensor(
    sensor: &mut dyn PressureSensor,
    coefficients: &PressureCoefficients,
) -> Result<PressureReading, String> {
    let temperature = sensor
        .period(PressureChannel::Temperature)
        .map_err(|e| format!("Temperature period read failed: {e}"))?;
    let pressure = sensor
        .period(PressureChannel::Pressure)
        .map_err(|e| format!("Pressure period read failed: {e}"))?;

    sensor.start_measurement(PressureChannel::Temperature)?;
    sensor.start_measurement(PressureChannel::Pressure)?;

    coefficients.calibrate(temperature.period_us, pressure.period_us)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedBoard;

    #[test]
    fn failed_read_keeps_last_value() {
        let board = SimulatedBoard::new(16);
        let cal = PressureCoefficients::default();
        let mut source = PressureSource::sensor(board.pressure_sensor(), cal);

        // Not started: nothing read, no flags beyond the source kind
        let s = source.update().unwrap();
        assert!(!s.valid);
        assert_eq!(s.flags, 0);

        source.start().unwrap();
        let first = source.update().unwrap();
        assert!(first.valid);
        assert_eq!(first.flags, pressure_flags::SENSOR_RUNNING);

        board.set_pressure_failure(true);
        assert!(source.update().is_err());
        let stale = source.latest();
        assert_eq!(stale.reading, first.reading);
        assert_eq!(
            stale.flags,
            pressure_flags::SENSOR_RUNNING | pressure_flags::STALE
        );

        board.set_pressure_failure(false);
        let recovered = source.update().unwrap();
        assert_eq!(recovered.flags & pressure_flags::STALE, 0);
    }

    #[test]
    fn simulated_source_is_flagged() {
        let mut source = PressureSource::simulated(SimulatedAscent::new(100.0, 10.0));
        source.start().unwrap();
        let a = source.update().unwrap();
        let b = source.update().unwrap();

        assert_eq!(a.reading.pressure_dbar, 100.0);
        assert_eq!(b.reading.pressure_dbar, 90.0);
        assert_ne!(b.flags & pressure_flags::SIMULATED, 0);
    }
}
