//! Frame assembly: pixel transforms and header telemetry.

use chrono::{DateTime, Utc};

use hypernav_shared::frame::quality;
use hypernav_shared::{DataKind, FrameHeader};

use super::readout::Readout;
use super::side_state::SideState;
use crate::config::GpsFix;
use crate::frame::AcquiredFrame;
use crate::hardware::PressureSample;
use crate::math::solar::solar_azimuth;

/// Smallest non-negative offset that keeps `light + up_shift - dark`
/// non-negative for every pixel.
pub fn up_shift(light: &[u16], dark: &[u16]) -> u16 {
    light
        .iter()
        .zip(dark)
        .map(|(&l, &d)| (d as i32 - l as i32).max(0))
        .max()
        .unwrap_or(0) as u16
}

/// Write `light + up_shift - dark` into `out` and return the up-shift.
/// Pixels that would exceed the counter range are clamped.
pub fn light_minus_dark(light: &[u16], dark: &[u16], out: &mut Vec<u16>) -> u16 {
    let shift = up_shift(light, dark);
    out.clear();
    out.extend(light.iter().zip(dark).map(|(&l, &d)| {
        (l as i32 + shift as i32 - d as i32).clamp(0, u16::MAX as i32) as u16
    }));
    shift
}

/// Inputs to one frame that do not come from the side's own state
#[derive(Clone, Copy, Debug)]
pub struct FrameInputs {
    pub time: DateTime<Utc>,
    pub kind: DataKind,
    pub pressure: PressureSample,
    pub gps: Option<GpsFix>,
    pub saturation: u16,
}

/// Fill `frame` from the side's buffers and telemetry.
pub fn assemble(frame: &mut AcquiredFrame, state: &SideState, inputs: &FrameInputs) {
    let dark = &state.buffers.dark;
    let light = &state.buffers.light;

    let mut q = 0;
    let mut shift = 0;
    let (over, overrun) = match inputs.kind {
        DataKind::Dark => {
            frame.pixels.clear();
            frame.pixels.extend_from_slice(dark.pixels());
            (dark.over, dark.overrun)
        }
        DataKind::Light => {
            frame.pixels.clear();
            frame.pixels.extend_from_slice(light.pixels());
            (light.over, light.overrun)
        }
        _ => {
            shift = light_minus_dark(light.pixels(), dark.pixels(), &mut frame.pixels);
            (light.over.max(dark.over), light.overrun || dark.overrun)
        }
    };

    if overrun {
        q |= quality::FIFO_OVERRUN;
    }
    if inputs.kind != DataKind::Dark && saturated(light, inputs.saturation) {
        q |= quality::SATURATED;
    }

    let att = &state.attitude;
    if att.is_empty() {
        q |= quality::NO_ATTITUDE;
    } else {
        q |= quality::tilt_band(att.tilt.mean() as f32);
    }

    let solar = match inputs.gps {
        Some(fix) => solar_azimuth(inputs.time, fix.latitude, fix.longitude) as f32,
        None => {
            q |= quality::NO_POSITION;
            0.0
        }
    };

    frame.header = FrameHeader {
        timestamp_ms: inputs.time.timestamp_millis(),
        sample_number: state.frames + 1,
        side: state.side,
        kind: inputs.kind,
        integration_ms: state.integration.current_time_ms(),
        dark_sample_number: state.darks,
        pixel_count: frame.pixels.len() as u16,
        up_shift: shift,
        fifo_over: over.min(u8::MAX as usize) as u8,
        quality: q,
        pressure_flags: inputs.pressure.flags,
        dark_average: dark.stats.average as f32,
        dark_noise: dark.stats.stddev as f32,
        spec_temperature: state.temperature_c as f32,
        pressure_dbar: inputs.pressure.reading.pressure_dbar as f32,
        pitch: att.pitch.mean() as f32,
        pitch_std: att.pitch.std() as f32,
        roll: att.roll.mean() as f32,
        roll_std: att.roll.std() as f32,
        tilt: att.tilt.mean() as f32,
        tilt_std: att.tilt.std() as f32,
        heading: att.heading.mean() as f32,
        heading_std: att.heading.std() as f32,
        solar_azimuth: solar,
    };
}

fn saturated(light: &Readout, saturation: u16) -> bool {
    !light.is_empty() && light.peak() > saturation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_shift_is_zero_when_light_dominates() {
        let light = [2_000, 2_100, 1_900];
        let dark = [1_500, 1_500, 1_500];
        let mut out = Vec::new();
        assert_eq!(light_minus_dark(&light, &dark, &mut out), 0);
        assert_eq!(out, [500, 600, 400]);
    }

    #[test]
    fn up_shift_lifts_negative_differences() {
        let light = [1_490, 1_600, 1_400, 1_500];
        let dark = [1_500, 1_500, 1_500, 1_500];
        let mut out = Vec::new();
        let shift = light_minus_dark(&light, &dark, &mut out);
        assert_eq!(shift, 100);
        assert_eq!(out, [90, 200, 0, 100]);
    }

    #[test]
    fn differences_are_never_negative() {
        // Deterministic pseudo-random rows
        let mut x: u32 = 0x2545_f491;
        let mut next = || {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x % 65_536) as u16
        };
        for _ in 0..200 {
            let light: Vec<u16> = (0..64).map(|_| next()).collect();
            let dark: Vec<u16> = (0..64).map(|_| next()).collect();
            let shift = up_shift(&light, &dark);
            for (&l, &d) in light.iter().zip(&dark) {
                assert!(l as i32 + shift as i32 - d as i32 >= 0);
            }
            let mut out = Vec::new();
            light_minus_dark(&light, &dark, &mut out);
            assert!(out.iter().any(|&p| p == 0) || shift == 0);
        }
    }

    #[test]
    fn saturated_max_values_clamp() {
        let light = [u16::MAX, 0];
        let dark = [0, u16::MAX];
        let mut out = Vec::new();
        let shift = light_minus_dark(&light, &dark, &mut out);
        assert_eq!(shift, u16::MAX);
        assert_eq!(out, [u16::MAX, 0]);
    }
}
