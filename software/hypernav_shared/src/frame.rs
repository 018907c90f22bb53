//! Header that precedes the pixel payload of every acquired frame,
//! both in memory and in the flash stack.
use byte_struct::*;

use crate::acquisition::{DataKind, Side};

/// Bits of [`FrameHeader::quality`]
pub mod quality {
    /// Housing tilt band: 0 is <1 degree, 1 is <3, 2 is <5, 3 is 5 or more
    pub const TILT_BAND_MASK: u16 = 0b11;

    /// Stray pixels exceeded the drain limit; the pixel window may be misaligned
    pub const FIFO_OVERRUN: u16 = 1 << 2;

    /// Light peak exceeded the saturation threshold
    pub const SATURATED: u16 = 1 << 3;

    /// No tilt/heading samples were taken for this frame
    pub const NO_ATTITUDE: u16 = 1 << 4;

    /// No position fix was configured, so the solar azimuth is not meaningful
    pub const NO_POSITION: u16 = 1 << 5;

    /// Encode a tilt angle in degrees as a tilt band
    pub fn tilt_band(tilt_deg: f32) -> u16 {
        match tilt_deg.abs() {
            t if t < 1.0 => 0,
            t if t < 3.0 => 1,
            t if t < 5.0 => 2,
            _ => 3,
        }
    }
}

/// Bits of [`FrameHeader::pressure_flags`]
pub mod pressure_flags {
    /// The pressure sensor was powered and being sampled
    pub const SENSOR_RUNNING: u8 = 1 << 0;

    /// The latest read failed and the value is carried over from an earlier reading
    pub const STALE: u8 = 1 << 1;

    /// The value came from the simulated ascent model
    pub const SIMULATED: u8 = 1 << 2;
}

/// Auxiliary telemetry attached to one spectrum.
#[derive(ByteStruct, Clone, Copy, Debug, Default, PartialEq)]
#[byte_struct_le]
pub struct FrameHeader {
    /// Milliseconds since the unix epoch
    pub timestamp_ms: i64,

    /// Frames assembled on this side since acquisition start
    pub sample_number: u32,

    pub side: Side,
    pub kind: DataKind,
    pub integration_ms: u16,

    /// Number of dark readouts behind the dark values of this frame
    pub dark_sample_number: u16,

    pub pixel_count: u16,

    /// Constant added to every light-minus-dark pixel to keep it non-negative
    pub up_shift: u16,

    /// Stray pixels skipped ahead of the valid pixel window
    pub fifo_over: u8,

    /// See [`quality`]
    pub quality: u16,

    /// See [`pressure_flags`]
    pub pressure_flags: u8,

    pub dark_average: f32,
    pub dark_noise: f32,

    /// Degrees C
    pub spec_temperature: f32,

    /// Decibar
    pub pressure_dbar: f32,

    // Degrees
    pub pitch: f32,
    pub pitch_std: f32,
    pub roll: f32,
    pub roll_std: f32,
    pub tilt: f32,
    pub tilt_std: f32,
    pub heading: f32,
    pub heading_std: f32,
    pub solar_azimuth: f32,
}

impl FrameHeader {
    pub fn tilt_band(&self) -> u16 {
        self.quality & quality::TILT_BAND_MASK
    }

    pub fn has_quality(&self, bit: u16) -> bool {
        self.quality & bit != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_bands() {
        assert_eq!(quality::tilt_band(0.2), 0);
        assert_eq!(quality::tilt_band(-2.5), 1);
        assert_eq!(quality::tilt_band(4.99), 2);
        assert_eq!(quality::tilt_band(5.0), 3);
        assert_eq!(quality::tilt_band(40.0), 3);
    }

    #[test]
    fn header_bytes_roundtrip_with_flags() {
        let header = FrameHeader {
            timestamp_ms: 1_700_000_000_123,
            sample_number: 42,
            side: Side::Starboard,
            kind: DataKind::LightMinusDark,
            integration_ms: 160,
            quality: quality::FIFO_OVERRUN | 2,
            pressure_dbar: 123.5,
            ..Default::default()
        };
        let mut buf = [0_u8; FrameHeader::BYTE_LEN];
        header.write_bytes(&mut buf);
        let parsed = FrameHeader::read_bytes(&buf);

        assert_eq!(parsed, header);
        assert_eq!(parsed.tilt_band(), 2);
        assert!(parsed.has_quality(quality::FIFO_OVERRUN));
        assert!(!parsed.has_quality(quality::SATURATED));
    }
}
