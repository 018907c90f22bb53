//! Acquisition configuration, stored as JSON.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hypernav_shared::{SIDE_COUNT, Side};

use crate::acquisition::integration::MAX_INDEX;
use crate::buffer_pool::DEFAULT_POOL_SIZE;
use crate::hardware::{PressureSensor, PressureSource};
use crate::math::{AccelCalibration, MagCalibration, PressureCoefficients};
use crate::profile::{ProfileConfig, SimulatedAscent};

/// Position used for the solar azimuth, decimal degrees (north and east positive)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where profile pressure readings come from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub enum PressureSourceKind {
    /// No pressure sensor fitted
    None,

    /// Quartz sensor through the frequency counters
    #[default]
    Sensor,

    /// Deterministic ascent for bench testing
    Simulated(SimulatedAscent),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PressureConfig {
    pub source: PressureSourceKind,
    pub coefficients: PressureCoefficients,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            source: PressureSourceKind::Sensor,
            coefficients: PressureCoefficients::default(),
        }
    }
}

impl PressureConfig {
    /// Build the configured source. `sensor` is only used for [`PressureSourceKind::Sensor`].
    pub fn build(&self, sensor: Box<dyn PressureSensor>) -> PressureSource {
        match self.source {
            PressureSourceKind::None => PressureSource::none(),
            PressureSourceKind::Sensor => PressureSource::sensor(sensor, self.coefficients),
            PressureSourceKind::Simulated(model) => PressureSource::simulated(model),
        }
    }
}

/// Flash device geometry for the profile stack
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct FlashGeometry {
    pub sector_size: usize,
    pub sector_count: usize,
}

impl Default for FlashGeometry {
    fn default() -> Self {
        Self {
            sector_size: 256 * 1024,
            sector_count: 64,
        }
    }
}

/// Scheduler sleep periods
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct LoopPeriods {
    /// While either side is sampling
    pub active_ms: u64,

    /// While both sides are idle
    pub idle_ms: u64,

    /// While a profile waits to reach its next breakpoint
    pub delay_ms: u64,
}

impl Default for LoopPeriods {
    fn default() -> Self {
        Self {
            active_ms: 10,
            idle_ms: 250,
            delay_ms: 333,
        }
    }
}

impl LoopPeriods {
    pub fn active(&self) -> Duration {
        Duration::from_millis(self.active_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Everything the acquisition engine reads from the parameter store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DaqConfig {
    /// Spectrometer serial numbers; zero disables that side
    pub serial_numbers: [u32; SIDE_COUNT],

    pub shutters_fitted: bool,

    /// Valid pixels per readout
    pub pixel_count: usize,

    /// Readouts discarded ahead of each kept readout
    pub clearouts: u16,

    /// Peak counts above which the exposure is shortened
    pub saturation_counts: u16,

    /// Ladder index for the first exposure of a session
    pub initial_integration_index: usize,

    /// Used when a start command carries a zero count
    pub default_lights_per_dark: u16,

    pub periods: LoopPeriods,
    pub profile: ProfileConfig,
    pub gps: Option<GpsFix>,

    pub accel: AccelCalibration,
    pub mag: MagCalibration,

    /// Raw samples averaged per attitude reading
    pub attitude_samples: u16,

    pub pressure: PressureConfig,
    pub pool_size: usize,

    /// Frames the stream consumer may fall behind by before frames are dropped
    pub stream_depth: usize,

    pub flash: FlashGeometry,
}

impl Default for DaqConfig {
    fn default() -> Self {
        Self {
            serial_numbers: [1, 2],
            shutters_fitted: true,
            pixel_count: 2048,
            clearouts: 2,
            saturation_counts: 55_000,
            initial_integration_index: 4,
            default_lights_per_dark: 5,
            periods: LoopPeriods::default(),
            profile: ProfileConfig::default(),
            gps: None,
            accel: AccelCalibration::default(),
            mag: MagCalibration::default(),
            attitude_samples: 4,
            pressure: PressureConfig::default(),
            pool_size: DEFAULT_POOL_SIZE,
            stream_depth: 8,
            flash: FlashGeometry::default(),
        }
    }
}

impl DaqConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {e}"))?;
        fs::write(path, text).map_err(|e| format!("Failed to write config {}: {e}", path.display()))
    }

    /// Check values that would leave the engine unable to run.
    /// A zero serial number is not an error; it disables that side.
    pub fn validate(&self) -> Result<(), String> {
        if self.pixel_count == 0 || self.pixel_count > u16::MAX as usize {
            return Err(format!("Pixel count {} out of range", self.pixel_count));
        }
        if self.initial_integration_index > MAX_INDEX {
            return Err(format!(
                "Initial integration index {} exceeds ladder top {MAX_INDEX}",
                self.initial_integration_index
            ));
        }
        if self.saturation_counts == 0 {
            return Err("Saturation counts must be positive".to_string());
        }
        if self.pool_size == 0 {
            return Err("Frame pool needs at least one slot".to_string());
        }
        if self.flash.sector_size == 0 || self.flash.sector_count == 0 {
            return Err("Flash geometry must have nonzero sectors".to_string());
        }
        self.profile.bands.validate()?;
        Ok(())
    }

    pub fn side_enabled(&self, side: Side) -> bool {
        self.serial_numbers
            .get(side.index())
            .is_some_and(|&sn| sn != 0)
    }
}
