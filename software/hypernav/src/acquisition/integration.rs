//! Exposure selection from a fixed ladder of integration times.

/// Admissible integration times in milliseconds, shortest first
pub const INTEGRATION_LADDER_MS: [u16; 9] = [11, 20, 40, 80, 160, 320, 640, 1280, 1920];

/// Highest ladder index
pub const MAX_INDEX: usize = INTEGRATION_LADDER_MS.len() - 1;

/// Signal below `saturation / ADJUST_FACTOR` calls for a longer exposure
pub const ADJUST_FACTOR: u32 = 4;

/// Ladder index whose time is closest to `ms`
pub fn nearest_index(ms: u16) -> usize {
    INTEGRATION_LADDER_MS
        .iter()
        .enumerate()
        .min_by_key(|(_, t)| t.abs_diff(ms))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Direction of the next ladder step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    Shorter,
    Hold,
    Longer,
}

/// Compare the light peak against the saturation threshold.
pub fn evaluate(peak: u16, dark_peak: u16, saturation: u16) -> Adjustment {
    if peak > saturation {
        Adjustment::Shorter
    } else if (peak.saturating_sub(dark_peak) as u32) < saturation as u32 / ADJUST_FACTOR {
        Adjustment::Longer
    } else {
        Adjustment::Hold
    }
}

/// Per-side integration time.
///
/// `next_index` is staged after each light readout and only becomes
/// `current_index` through [`IntegrationTimeState::commit`] at the start of
/// a dark cycle, so a dark/light pair always shares one exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegrationTimeState {
    current_index: usize,
    current_time_ms: u16,
    next_index: usize,

    /// Commanded time that bypasses the ladder
    fixed_ms: Option<u16>,
}

impl Default for IntegrationTimeState {
    fn default() -> Self {
        Self::auto(0)
    }
}

impl IntegrationTimeState {
    /// Automatic control starting from `index`
    pub fn auto(index: usize) -> Self {
        let index = index.min(MAX_INDEX);
        Self {
            current_index: index,
            current_time_ms: INTEGRATION_LADDER_MS[index],
            next_index: index,
            fixed_ms: None,
        }
    }

    /// Hold a commanded time. The index tracks the nearest ladder step for reporting.
    pub fn fixed(ms: u16) -> Self {
        let index = nearest_index(ms);
        Self {
            current_index: index,
            current_time_ms: ms,
            next_index: index,
            fixed_ms: Some(ms),
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn current_time_ms(&self) -> u16 {
        self.current_time_ms
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_ms.is_some()
    }

    /// A different exposure is waiting for the next dark cycle
    pub fn change_staged(&self) -> bool {
        self.fixed_ms.is_none() && self.next_index != self.current_index
    }

    /// Stage one ladder step from the last light readout. Returns the staged index.
    pub fn stage(&mut self, peak: u16, dark_peak: u16, saturation: u16) -> usize {
        if self.fixed_ms.is_some() {
            return self.next_index;
        }
        self.next_index = match evaluate(peak, dark_peak, saturation) {
            Adjustment::Shorter => self.current_index.saturating_sub(1),
            Adjustment::Longer => (self.current_index + 1).min(MAX_INDEX),
            Adjustment::Hold => self.current_index,
        };
        self.next_index
    }

    /// Stage an explicit index, one step at most from the current index
    pub fn stage_index(&mut self, index: usize) -> usize {
        if self.fixed_ms.is_some() {
            return self.next_index;
        }
        let lo = self.current_index.saturating_sub(1);
        let hi = (self.current_index + 1).min(MAX_INDEX);
        self.next_index = index.clamp(lo, hi);
        self.next_index
    }

    /// Apply the staged index. Returns whether the exposure changed.
    pub fn commit(&mut self) -> bool {
        if self.fixed_ms.is_some() || self.next_index == self.current_index {
            return false;
        }
        self.current_index = self.next_index;
        self.current_time_ms = INTEGRATION_LADDER_MS[self.current_index];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_doubles_after_first_step() {
        for w in INTEGRATION_LADDER_MS[1..8].windows(2) {
            assert_eq!(w[1], 2 * w[0]);
        }
        assert_eq!(nearest_index(100), 3);
        assert_eq!(nearest_index(150), 4);
        assert_eq!(nearest_index(5000), MAX_INDEX);
    }

    #[test]
    fn adjustment_thresholds() {
        assert_eq!(evaluate(60_000, 1_500, 55_000), Adjustment::Shorter);
        assert_eq!(evaluate(10_000, 1_500, 55_000), Adjustment::Longer);
        assert_eq!(evaluate(30_000, 1_500, 55_000), Adjustment::Hold);
        // Exactly at the margin holds
        assert_eq!(evaluate(1_500 + 13_750, 1_500, 55_000), Adjustment::Hold);
    }

    #[test]
    fn staged_index_stays_in_bounds_and_moves_one_step() {
        let mut s = IntegrationTimeState::auto(0);
        assert_eq!(s.stage(60_000, 0, 55_000), 0);

        let mut s = IntegrationTimeState::auto(MAX_INDEX);
        assert_eq!(s.stage(100, 0, 55_000), MAX_INDEX);

        let mut s = IntegrationTimeState::auto(4);
        assert_eq!(s.stage_index(0), 3);
        assert_eq!(s.stage_index(8), 5);

        for start in 0..=MAX_INDEX {
            for peak in [0_u16, 5_000, 30_000, 65_535] {
                let mut s = IntegrationTimeState::auto(start);
                let next = s.stage(peak, 0, 55_000);
                assert!(next <= MAX_INDEX);
                assert!(next.abs_diff(start) <= 1);
            }
        }
    }

    #[test]
    fn change_applies_only_on_commit() {
        let mut s = IntegrationTimeState::auto(3);
        s.stage(100, 0, 55_000);
        assert!(s.change_staged());
        assert_eq!(s.current_time_ms(), 80);

        assert!(s.commit());
        assert_eq!(s.current_time_ms(), 160);
        assert!(!s.change_staged());
        assert!(!s.commit());
    }

    #[test]
    fn fixed_time_is_never_adjusted() {
        let mut s = IntegrationTimeState::fixed(100);
        s.stage(65_535, 0, 55_000);
        assert!(!s.change_staged());
        assert!(!s.commit());
        assert_eq!(s.current_time_ms(), 100);
    }
}
