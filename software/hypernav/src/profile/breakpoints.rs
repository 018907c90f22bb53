//! Pressure breakpoints that schedule single measurements during an ascent.

use serde::{Deserialize, Serialize};

/// Unused entries kept past the last breakpoint
pub const GUARD_ENTRIES: usize = 2;

/// Default table capacity including guard entries
pub const DEFAULT_CAPACITY: usize = 512;

/// Depth bands used to build a [`ProfileBreakpointTable`], in dbar.
///
/// The lower band runs from `lower_start` up to `middle_start` and the
/// middle band from `middle_start` up to `upper_start`. Shallower than
/// `upper_start` the profile samples continuously.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ProfileBands {
    pub lower_start: f64,
    pub lower_interval: f64,
    pub middle_start: f64,
    pub middle_interval: f64,
    pub upper_start: f64,
    pub capacity: usize,
}

impl Default for ProfileBands {
    fn default() -> Self {
        Self {
            lower_start: 500.0,
            lower_interval: 50.0,
            middle_start: 200.0,
            middle_interval: 20.0,
            upper_start: 10.0,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ProfileBands {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.lower_start >= self.middle_start && self.middle_start >= self.upper_start) {
            return Err(format!(
                "Profile band starts must not increase toward the surface: {} / {} / {}",
                self.lower_start, self.middle_start, self.upper_start
            ));
        }
        if self.capacity <= GUARD_ENTRIES {
            return Err(format!(
                "Profile table capacity {} leaves no room past the {GUARD_ENTRIES} guard entries",
                self.capacity
            ));
        }
        Ok(())
    }

    pub fn build(&self) -> ProfileBreakpointTable {
        ProfileBreakpointTable::build(
            self.lower_start,
            self.lower_interval,
            self.middle_start,
            self.middle_interval,
            self.upper_start,
            self.capacity,
        )
    }
}

/// Ordered pressure breakpoints from deepest to shallowest, with a forward-only
/// cursor to the next breakpoint that has not been sampled yet.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileBreakpointTable {
    points: Vec<f64>,
    next: usize,
}

impl ProfileBreakpointTable {
    /// Step from `lower_start` by `lower_interval` while deeper than
    /// `middle_start`, then from `middle_start` by `middle_interval` while
    /// deeper than `upper_start`, and finish with `upper_start`.
    ///
    /// A band with a non-positive interval contributes no points. The table
    /// never grows past `capacity` less the guard entries; the final
    /// `upper_start` point is always kept.
    pub fn build(
        lower_start: f64,
        lower_interval: f64,
        middle_start: f64,
        middle_interval: f64,
        upper_start: f64,
        capacity: usize,
    ) -> Self {
        let usable = capacity.saturating_sub(GUARD_ENTRIES).max(1);
        let mut points = Vec::with_capacity(usable);

        for (start, interval, stop) in [
            (lower_start, lower_interval, middle_start),
            (middle_start, middle_interval, upper_start),
        ] {
            if interval <= 0.0 {
                continue;
            }
            let mut p = start;
            while p > stop && points.len() < usable - 1 {
                points.push(p);
                p -= interval;
            }
        }
        points.push(upper_start);

        Self { points, next: 0 }
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Number of breakpoints. The shallowest breakpoint is `point(last() - 1)`.
    pub fn last(&self) -> usize {
        self.points.len()
    }

    pub fn next(&self) -> usize {
        self.next
    }

    pub fn point(&self, i: usize) -> Option<f64> {
        self.points.get(i).copied()
    }

    /// Shallowest breakpoint
    pub fn shallowest(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    /// Next breakpoint still to be sampled, if any
    pub fn next_point(&self) -> Option<f64> {
        self.point(self.next)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.points.len()
    }

    /// Move the cursor past every breakpoint at or below `pressure_dbar`,
    /// so one measurement covers all breakpoints crossed since the last.
    /// Always advances by at least one.
    pub fn advance(&mut self, pressure_dbar: f64) {
        self.next = (self.next + 1).min(self.points.len());
        while self.next < self.points.len() && self.points[self.next] >= pressure_dbar {
            self.next += 1;
        }
    }

    /// Rewind the cursor for a new profile
    pub fn rewind(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bands_table() {
        let table = ProfileBands::default().build();
        let mut expected: Vec<f64> = (0..6).map(|i| 500.0 - 50.0 * i as f64).collect();
        expected.extend((0..10).map(|i| 200.0 - 20.0 * i as f64));
        expected.push(10.0);

        assert_eq!(table.points(), &expected[..]);
        assert_eq!(table.points()[5], 250.0);
        assert_eq!(table.shallowest(), 10.0);
        assert_eq!(table.next(), 0);
    }

    #[test]
    fn table_is_non_increasing() {
        for (li, mi) in [(50.0, 20.0), (37.0, 3.5), (100.0, 1.0), (0.0, 5.0)] {
            let table = ProfileBreakpointTable::build(1000.0, li, 300.0, mi, 5.0, 4096);
            for w in table.points().windows(2) {
                assert!(w[0] >= w[1], "{:?}", w);
            }
            assert_eq!(table.shallowest(), 5.0);
        }
    }

    #[test]
    fn capacity_keeps_guard_entries_and_final_point() {
        let table = ProfileBreakpointTable::build(500.0, 1.0, 200.0, 1.0, 10.0, 8);
        assert_eq!(table.last(), 8 - GUARD_ENTRIES);
        assert_eq!(table.points()[..5], [500.0, 499.0, 498.0, 497.0, 496.0]);
        assert_eq!(table.shallowest(), 10.0);
    }

    #[test]
    fn advance_skips_crossed_points() {
        let mut table = ProfileBands::default().build();
        table.advance(500.0);
        assert_eq!(table.next_point(), Some(450.0));

        // Surfaced quickly past several breakpoints
        table.advance(395.0);
        assert_eq!(table.next_point(), Some(350.0));

        while !table.is_exhausted() {
            table.advance(0.0);
        }
        assert_eq!(table.next_point(), None);
    }
}
