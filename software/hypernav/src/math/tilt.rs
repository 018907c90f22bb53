//! Housing attitude from the accelerometer and magnetometer.
//!
//! Sensor frame: x forward, y starboard, z up through the optical axis.
//! A housing at rest and level reads gravity as +z.

use serde::{Deserialize, Serialize};

/// Per-axis offset and gain applied to raw accelerometer counts
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AccelCalibration {
    pub offset: [f64; 3],
    pub gain: [f64; 3],
}

impl Default for AccelCalibration {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            gain: [1.0; 3],
        }
    }
}

/// Hard-iron offset and diagonal soft-iron gain for the magnetometer
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MagCalibration {
    pub hard_iron: [f64; 3],
    pub soft_iron: [f64; 3],
}

impl Default for MagCalibration {
    fn default() -> Self {
        Self {
            hard_iron: [0.0; 3],
            soft_iron: [1.0; 3],
        }
    }
}

/// Housing attitude in degrees
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attitude {
    pub pitch: f64,
    pub roll: f64,
    /// Angle between the optical axis and vertical
    pub tilt: f64,
    /// Magnetic heading in [0, 360)
    pub heading: f64,
}

fn apply(raw: [f64; 3], offset: [f64; 3], gain: [f64; 3]) -> [f64; 3] {
    [
        (raw[0] - offset[0]) * gain[0],
        (raw[1] - offset[1]) * gain[1],
        (raw[2] - offset[2]) * gain[2],
    ]
}

/// Pitch, roll and tilt in degrees from raw accelerometer counts.
pub fn pitch_roll_tilt(raw: [f64; 3], cal: &AccelCalibration) -> Result<(f64, f64, f64), String> {
    let [ax, ay, az] = apply(raw, cal.offset, cal.gain);
    let norm = (ax * ax + ay * ay + az * az).sqrt();
    if !(norm.is_finite() && norm > 0.0) {
        return Err(format!("Degenerate acceleration vector {raw:?}"));
    }

    let pitch = (-ax).atan2((ay * ay + az * az).sqrt());
    let roll = ay.atan2(az);
    let tilt = (az / norm).clamp(-1.0, 1.0).acos();

    Ok((pitch.to_degrees(), roll.to_degrees(), tilt.to_degrees()))
}

/// Tilt-compensated magnetic heading in degrees, given pitch and roll in degrees.
pub fn heading(
    raw: [f64; 3],
    cal: &MagCalibration,
    pitch_deg: f64,
    roll_deg: f64,
) -> Result<f64, String> {
    let [mx, my, mz] = apply(raw, cal.hard_iron, cal.soft_iron);
    if !(mx.is_finite() && my.is_finite() && mz.is_finite()) {
        return Err(format!("Non-finite magnetic vector {raw:?}"));
    }

    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    let (sr, cr) = roll_deg.to_radians().sin_cos();

    // Project the field onto the horizontal plane
    let xh = mx * cp + mz * sp;
    let yh = mx * sr * sp + my * cr - mz * sr * cp;
    if xh == 0.0 && yh == 0.0 {
        return Err("Magnetic field is vertical; heading undefined".to_string());
    }

    Ok((-yh).atan2(xh).to_degrees().rem_euclid(360.0))
}

/// Full attitude from one accelerometer and one magnetometer sample
pub fn attitude(
    accel_raw: [f64; 3],
    mag_raw: [f64; 3],
    accel_cal: &AccelCalibration,
    mag_cal: &MagCalibration,
) -> Result<Attitude, String> {
    let (pitch, roll, tilt) = pitch_roll_tilt(accel_raw, accel_cal)?;
    let heading = heading(mag_raw, mag_cal, pitch, roll)?;
    Ok(Attitude {
        pitch,
        roll,
        tilt,
        heading,
    })
}
