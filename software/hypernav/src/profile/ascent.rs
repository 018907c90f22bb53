use serde::{Deserialize, Serialize};

/// Sea-level atmospheric pressure as read by a gauge referenced to vacuum
pub const SURFACE_DBAR: f64 = 10.13;

/// Deterministic stand-in for the pressure sensor during bench profiles.
///
/// Each reading returns the current depth and then rises by a fixed step,
/// holding at the surface once it gets there.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SimulatedAscent {
    pub start_dbar: f64,
    pub rate_dbar_per_read: f64,
    pub temperature_c: f64,

    #[serde(skip)]
    current_dbar: f64,
}

impl Default for SimulatedAscent {
    fn default() -> Self {
        Self::new(520.0, 2.0)
    }
}

impl SimulatedAscent {
    pub fn new(start_dbar: f64, rate_dbar_per_read: f64) -> Self {
        Self {
            start_dbar,
            rate_dbar_per_read,
            temperature_c: 12.0,
            current_dbar: start_dbar,
        }
    }

    /// Return to the starting depth
    pub fn reset(&mut self) {
        self.current_dbar = self.start_dbar;
    }

    pub fn current(&self) -> f64 {
        self.current_dbar
    }

    pub fn next_pressure(&mut self) -> f64 {
        let p = self.current_dbar;
        self.current_dbar = (p - self.rate_dbar_per_read.abs()).max(SURFACE_DBAR.min(self.start_dbar));
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascends_and_holds_at_surface() {
        let mut model = SimulatedAscent::new(30.0, 8.0);
        let seq: Vec<f64> = (0..6).map(|_| model.next_pressure()).collect();
        assert_eq!(seq[..3], [30.0, 22.0, 14.0]);
        assert!(seq[3..].iter().all(|&p| p == SURFACE_DBAR));

        model.reset();
        assert_eq!(model.next_pressure(), 30.0);
    }

    #[test]
    fn config_roundtrip_restarts_at_start_depth() {
        let mut model = SimulatedAscent::new(200.0, 5.0);
        model.next_pressure();
        let json = serde_json::to_string(&model).unwrap();
        let mut parsed: SimulatedAscent = serde_json::from_str(&json).unwrap();
        parsed.reset();
        assert_eq!(parsed.current(), 200.0);
    }
}
