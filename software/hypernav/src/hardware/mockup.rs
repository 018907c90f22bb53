//! Software stand-in for the spectrometer board.
//!
//! All handles produced by one [`SimulatedBoard`] share its state, so a test
//! can hand the handles to an engine and keep the board to steer faults and
//! inspect the event log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use hypernav_shared::{PIXEL_LEAD_IN, SIDE_COUNT, Side};

use super::{
    FifoLevel, Hardware, PeriodReading, PressureChannel, PressureSensor, PressureSource, Shutter,
    SpectrometerFifo, TiltHeading,
};
use crate::math::PressureCoefficients;

/// Words the simulated FIFO holds before reporting full
pub const FIFO_CAPACITY: usize = 65_536;

/// Hardware actions recorded in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    ShutterOpen(Side),
    ShutterClose(Side),
    ShutterPowerOff,
    Power(Side, bool),
    CaptureStart {
        side: Side,
        integration_ms: u16,
        clearouts: u16,
    },
    PressureStart(PressureChannel),
    PressureStop,
}

#[derive(Debug)]
struct Capture {
    integration_ms: u16,
    clearouts: u16,
    samples: u16,
    shutter_open: bool,
    polls_remaining: u32,
}

#[derive(Debug)]
struct SideSim {
    powered: bool,
    shutter_open: bool,
    capture: Option<Capture>,
    fifo: VecDeque<u16>,
    spectra: u16,

    // Steering
    fail_capture: bool,
    stray_pixels: usize,
    dark_counts: u16,
    signal_per_ms: f64,
    temperature_c: f64,
}

impl Default for SideSim {
    fn default() -> Self {
        Self {
            powered: false,
            shutter_open: false,
            capture: None,
            fifo: VecDeque::new(),
            spectra: 0,
            fail_capture: false,
            stray_pixels: 0,
            dark_counts: 1_500,
            signal_per_ms: 50.0,
            temperature_c: 18.5,
        }
    }
}

#[derive(Debug)]
struct BoardState {
    pixel_count: usize,
    polls_per_readout: u32,
    sides: [SideSim; SIDE_COUNT],
    events: Vec<BoardEvent>,

    accel: [f64; 3],
    mag: [f64; 3],
    fail_attitude: bool,

    periods_us: (f64, f64),
    fail_pressure: bool,
}

impl BoardState {
    /// Fill the FIFO with the clearout readouts followed by the sample readouts
    fn complete_capture(&mut self, i: usize) {
        let n = self.pixel_count;
        let side = &mut self.sides[i];
        let Some(capture) = side.capture.take() else {
            return;
        };

        side.fifo.clear();
        for _ in 0..capture.clearouts {
            side.fifo
                .extend(std::iter::repeat_n(0_u16, PIXEL_LEAD_IN + n));
        }
        for _ in 0..capture.samples {
            side.fifo
                .extend(std::iter::repeat_n(u16::MAX, side.stray_pixels));
            side.fifo.extend(std::iter::repeat_n(0_u16, PIXEL_LEAD_IN));
            let row: Vec<u16> = (0..n)
                .map(|px| simulated_pixel(side, &capture, px, n))
                .collect();
            side.fifo.extend(row);
        }
        side.spectra = capture.clearouts + capture.samples;
    }
}

/// Dark baseline with a small fixed pattern, plus a smooth signal
/// proportional to integration time when the shutter was open.
fn simulated_pixel(side: &SideSim, capture: &Capture, px: usize, n: usize) -> u16 {
    let dark = side.dark_counts as f64 + (px % 7) as f64;
    if !capture.shutter_open {
        return dark as u16;
    }
    let x = px as f64 / n.max(1) as f64;
    let shape = 0.25 + 0.75 * (std::f64::consts::PI * x).sin();
    let light = dark + side.signal_per_ms * capture.integration_ms as f64 * shape;
    light.min(u16::MAX as f64) as u16
}

/// Simulated spectrometer board
#[derive(Clone, Debug)]
pub struct SimulatedBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoard {
    pub fn new(pixel_count: usize) -> Self {
        let state = BoardState {
            pixel_count,
            polls_per_readout: 1,
            sides: Default::default(),
            events: Vec::new(),
            accel: [0.0, 0.0, 1.0],
            mag: [1.0, 0.0, 0.5],
            fail_attitude: false,
            periods_us: (5.8, 28.0),
            fail_pressure: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        // A panicking test thread must not hide the board from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn shutter(&self) -> Box<dyn Shutter> {
        Box::new(SimShutter(self.clone()))
    }

    pub fn spectrometer(&self) -> Box<dyn SpectrometerFifo> {
        Box::new(SimSpectrometer(self.clone()))
    }

    pub fn tilt(&self) -> Box<dyn TiltHeading> {
        Box::new(SimTiltHeading(self.clone()))
    }

    pub fn pressure_sensor(&self) -> Box<dyn PressureSensor> {
        Box::new(SimPressure(self.clone()))
    }

    /// Full hardware set with the live pressure sensor
    pub fn hardware(&self, coefficients: PressureCoefficients) -> Hardware {
        Hardware {
            shutter: self.shutter(),
            spectrometer: self.spectrometer(),
            tilt: self.tilt(),
            pressure: PressureSource::sensor(self.pressure_sensor(), coefficients),
        }
    }

    /// Full hardware set with a caller-chosen pressure source
    pub fn hardware_with_pressure(&self, pressure: PressureSource) -> Hardware {
        Hardware {
            shutter: self.shutter(),
            spectrometer: self.spectrometer(),
            tilt: self.tilt(),
            pressure,
        }
    }

    pub fn events(&self) -> Vec<BoardEvent> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    pub fn is_powered(&self, side: Side) -> bool {
        self.lock().sides[side.index()].powered
    }

    pub fn is_shutter_open(&self, side: Side) -> bool {
        self.lock().sides[side.index()].shutter_open
    }

    /// Number of scheduler polls before a started capture lands in the FIFO
    pub fn set_polls_per_readout(&self, polls: u32) {
        self.lock().polls_per_readout = polls.max(1);
    }

    pub fn set_capture_failure(&self, side: Side, fail: bool) {
        self.lock().sides[side.index()].fail_capture = fail;
    }

    /// Extra words clocked out ahead of the lead-in of each sample readout
    pub fn set_stray_pixels(&self, side: Side, n: usize) {
        self.lock().sides[side.index()].stray_pixels = n;
    }

    pub fn set_dark_counts(&self, side: Side, counts: u16) {
        self.lock().sides[side.index()].dark_counts = counts;
    }

    /// Peak light signal in counts per millisecond of integration
    pub fn set_signal(&self, side: Side, counts_per_ms: f64) {
        self.lock().sides[side.index()].signal_per_ms = counts_per_ms;
    }

    pub fn set_temperature(&self, side: Side, temperature_c: f64) {
        self.lock().sides[side.index()].temperature_c = temperature_c;
    }

    pub fn set_attitude_raw(&self, accel: [f64; 3], mag: [f64; 3]) {
        let mut s = self.lock();
        s.accel = accel;
        s.mag = mag;
    }

    pub fn set_attitude_failure(&self, fail: bool) {
        self.lock().fail_attitude = fail;
    }

    pub fn set_pressure_periods(&self, temperature_us: f64, pressure_us: f64) {
        self.lock().periods_us = (temperature_us, pressure_us);
    }

    pub fn set_pressure_failure(&self, fail: bool) {
        self.lock().fail_pressure = fail;
    }
}

struct SimShutter(SimulatedBoard);

impl Shutter for SimShutter {
    fn open(&mut self, side: Side) -> Result<(), String> {
        let mut s = self.0.lock();
        s.sides[side.index()].shutter_open = true;
        s.events.push(BoardEvent::ShutterOpen(side));
        Ok(())
    }

    fn close(&mut self, side: Side) -> Result<(), String> {
        let mut s = self.0.lock();
        s.sides[side.index()].shutter_open = false;
        s.events.push(BoardEvent::ShutterClose(side));
        Ok(())
    }

    fn power_off(&mut self) {
        self.0.lock().events.push(BoardEvent::ShutterPowerOff);
    }
}

struct SimSpectrometer(SimulatedBoard);

impl SpectrometerFifo for SimSpectrometer {
    fn set_power(&mut self, side: Side, on: bool) -> Result<(), String> {
        let mut s = self.0.lock();
        let sim = &mut s.sides[side.index()];
        sim.powered = on;
        if !on {
            sim.capture = None;
            sim.fifo.clear();
            sim.spectra = 0;
        }
        s.events.push(BoardEvent::Power(side, on));
        Ok(())
    }

    fn start_capture(
        &mut self,
        side: Side,
        integration_ms: u16,
        clearouts: u16,
        samples: u16,
    ) -> Result<(), String> {
        let mut s = self.0.lock();
        let polls = s.polls_per_readout;
        let sim = &mut s.sides[side.index()];
        if sim.fail_capture {
            return Err(format!("Spectrometer {} did not acknowledge start", side.label()));
        }
        if !sim.powered {
            return Err(format!("Spectrometer {} is not powered", side.label()));
        }

        sim.fifo.clear();
        sim.spectra = 0;
        sim.capture = Some(Capture {
            integration_ms,
            clearouts,
            samples,
            shutter_open: sim.shutter_open,
            polls_remaining: polls,
        });
        s.events.push(BoardEvent::CaptureStart {
            side,
            integration_ms,
            clearouts,
        });
        Ok(())
    }

    fn spectra_available(&mut self, side: Side) -> u16 {
        let mut s = self.0.lock();
        let i = side.index();
        let ready = match &mut s.sides[i].capture {
            Some(capture) => {
                capture.polls_remaining = capture.polls_remaining.saturating_sub(1);
                capture.polls_remaining == 0
            }
            None => false,
        };
        if ready {
            s.complete_capture(i);
        }
        s.sides[i].spectra
    }

    fn level(&mut self, side: Side) -> FifoLevel {
        match self.0.lock().sides[side.index()].fifo.len() {
            0 => FifoLevel::Empty,
            n if n >= FIFO_CAPACITY => FifoLevel::Full,
            n if n >= FIFO_CAPACITY / 2 => FifoLevel::HalfFull,
            _ => FifoLevel::Partial,
        }
    }

    fn pop_pixel(&mut self, side: Side) -> Option<u16> {
        self.0.lock().sides[side.index()].fifo.pop_front()
    }

    fn rearm(&mut self, side: Side) {
        let mut s = self.0.lock();
        let sim = &mut s.sides[side.index()];
        sim.fifo.clear();
        sim.spectra = 0;
    }

    fn temperature(&mut self, side: Side) -> Result<f64, String> {
        Ok(self.0.lock().sides[side.index()].temperature_c)
    }
}

struct SimTiltHeading(SimulatedBoard);

impl TiltHeading for SimTiltHeading {
    fn accel_raw(&mut self, _n_avg: u16) -> Result<[f64; 3], String> {
        let s = self.0.lock();
        if s.fail_attitude {
            return Err("Accelerometer did not respond".to_string());
        }
        Ok(s.accel)
    }

    fn mag_raw(&mut self, _n_avg: u16) -> Result<[f64; 3], String> {
        let s = self.0.lock();
        if s.fail_attitude {
            return Err("Magnetometer did not respond".to_string());
        }
        Ok(s.mag)
    }
}

struct SimPressure(SimulatedBoard);

impl PressureSensor for SimPressure {
    fn start_measurement(&mut self, channel: PressureChannel) -> Result<(), String> {
        self.0.lock().events.push(BoardEvent::PressureStart(channel));
        Ok(())
    }

    fn period(&mut self, channel: PressureChannel) -> Result<PeriodReading, String> {
        let s = self.0.lock();
        if s.fail_pressure {
            return Err("Frequency counter timed out".to_string());
        }
        let period_us = match channel {
            PressureChannel::Temperature => s.periods_us.0,
            PressureChannel::Pressure => s.periods_us.1,
        };
        let duration_ms = 250;
        Ok(PeriodReading {
            period_us,
            counts: (duration_ms as f64 * 1e3 / period_us) as u32,
            duration_ms,
        })
    }

    fn stop(&mut self) {
        self.0.lock().events.push(BoardEvent::PressureStop);
    }
}
