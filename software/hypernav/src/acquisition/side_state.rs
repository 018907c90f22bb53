use hypernav_shared::{Side, SpectrometerPhase};

use super::integration::IntegrationTimeState;
use super::readout::DarkLightBuffers;
use crate::math::{Attitude, CircularStats, RunningStats};

/// Housing attitude samples taken since the last light start
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttitudeAccumulator {
    pub pitch: RunningStats,
    pub roll: RunningStats,
    pub tilt: RunningStats,
    pub heading: CircularStats,
}

impl AttitudeAccumulator {
    pub fn push(&mut self, a: &Attitude) {
        self.pitch.push(a.pitch);
        self.roll.push(a.roll);
        self.tilt.push(a.tilt);
        self.heading.push(a.heading);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.tilt.count() == 0
    }
}

/// Everything the engine tracks for one spectrometer during a session.
#[derive(Clone, Debug)]
pub struct SideState {
    pub side: Side,
    pub enabled: bool,
    pub phase: SpectrometerPhase,
    pub integration: IntegrationTimeState,
    pub buffers: DarkLightBuffers,
    pub attitude: AttitudeAccumulator,

    /// Detector temperature from the latest readout, degrees C
    pub temperature_c: f64,

    /// Frames assembled this session
    pub frames: u32,

    /// Dark readouts this session
    pub darks: u16,

    pub lights_since_dark: u16,

    /// Dark readouts at the current exposure during a dark sweep
    pub darks_at_step: u16,
}

impl SideState {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            enabled: false,
            phase: SpectrometerPhase::Idle,
            integration: IntegrationTimeState::default(),
            buffers: DarkLightBuffers::default(),
            attitude: AttitudeAccumulator::default(),
            temperature_c: f64::NAN,
            frames: 0,
            darks: 0,
            lights_since_dark: 0,
            darks_at_step: 0,
        }
    }

    /// Reset counters for a new session, keeping buffer allocations
    pub fn begin(&mut self, enabled: bool, integration: IntegrationTimeState) {
        self.enabled = enabled;
        self.phase = SpectrometerPhase::Idle;
        self.integration = integration;
        self.attitude.reset();
        self.temperature_c = f64::NAN;
        self.frames = 0;
        self.darks = 0;
        self.lights_since_dark = 0;
        self.darks_at_step = 0;
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SpectrometerPhase::Idle
    }
}
