//! Quartz-resonator pressure calibration.
//!
//! The sensor reports two oscillation periods: one from a temperature-sensitive
//! crystal and one from the pressure-sensitive crystal. Fourteen calibration
//! coefficients map the pair to temperature and absolute pressure.

use serde::{Deserialize, Serialize};

use super::polyval;

/// Decibar per psi
const DBAR_PER_PSI: f64 = 0.689_475_7;

/// Fourteen-coefficient calibration, periods in microseconds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PressureCoefficients {
    /// Temperature period at 0 C
    pub u0: f64,

    /// Temperature polynomial, first to third order
    pub y: [f64; 3],

    /// Pressure scale polynomial
    pub c: [f64; 3],

    /// Nonlinearity polynomial
    pub d: [f64; 2],

    /// Zero-pressure period polynomial
    pub t: [f64; 5],
}

impl Default for PressureCoefficients {
    fn default() -> Self {
        // Nominal constants for a 1000 psia unit without temperature terms
        Self {
            u0: 5.8,
            y: [-3_950.0, -10_400.0, 0.0],
            c: [9_000.0, 0.0, 0.0],
            d: [0.04, 0.0],
            t: [26.5, 0.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Temperature and pressure from one pair of period readings
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct PressureReading {
    pub temperature_c: f64,
    pub pressure_dbar: f64,
}

impl PressureCoefficients {
    /// Build from the flat coefficient order used in calibration sheets:
    /// `U0, Y1, Y2, Y3, C1, C2, C3, D1, D2, T1, T2, T3, T4, T5`
    pub fn from_array(c: [f64; 14]) -> Self {
        Self {
            u0: c[0],
            y: [c[1], c[2], c[3]],
            c: [c[4], c[5], c[6]],
            d: [c[7], c[8]],
            t: [c[9], c[10], c[11], c[12], c[13]],
        }
    }

    /// Convert a temperature period and a pressure period (both microseconds)
    /// to temperature and absolute pressure.
    pub fn calibrate(
        &self,
        temperature_period_us: f64,
        pressure_period_us: f64,
    ) -> Result<PressureReading, String> {
        if !(temperature_period_us.is_finite() && temperature_period_us > 0.0) {
            return Err(format!(
                "Invalid temperature period {temperature_period_us} us"
            ));
        }
        if !(pressure_period_us.is_finite() && pressure_period_us > 0.0) {
            return Err(format!("Invalid pressure period {pressure_period_us} us"));
        }

        let u = temperature_period_us - self.u0;

        // The temperature polynomial has no constant term
        let temperature_c = u * polyval(u, &self.y);

        let c = polyval(u, &self.c);
        let d = polyval(u, &self.d);
        let t0 = polyval(u, &self.t);

        let ratio = 1.0 - (t0 * t0) / (pressure_period_us * pressure_period_us);
        let pressure_psia = c * ratio * (1.0 - d * ratio);

        Ok(PressureReading {
            temperature_c,
            pressure_dbar: pressure_psia * DBAR_PER_PSI,
        })
    }
}
