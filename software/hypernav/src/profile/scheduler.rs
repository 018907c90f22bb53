use serde::{Deserialize, Serialize};

use super::breakpoints::{ProfileBands, ProfileBreakpointTable};

/// Surface pressure reported by the float's pressure gauge, dbar
pub const PRES_AT_SURFACE: f64 = 10.5;

/// Allowance above [`PRES_AT_SURFACE`] still counted as surfaced
pub const SURFACE_MARGIN: f64 = 0.5;

/// Consecutive surfaced readings that end a profile
pub const SURFACE_CHECKS: u32 = 40;

/// What the acquisition task should do at the current depth
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileAction {
    /// Shallower than the last breakpoint: measure every cycle
    Continuous,

    /// A breakpoint was reached: take one measurement
    Single,

    /// Deeper than the next breakpoint: check again later
    Delay,

    /// At the surface: end the profile
    Complete,
}

/// Decide whether to measure at `pressure_dbar`, advancing the table cursor
/// when a single measurement is due.
pub fn measure_now(table: &mut ProfileBreakpointTable, pressure_dbar: f64) -> ProfileAction {
    let action = classify(table, pressure_dbar);
    if action == ProfileAction::Single {
        table.advance(pressure_dbar);
    }
    action
}

/// [`measure_now`] without moving the cursor
pub fn classify(table: &ProfileBreakpointTable, pressure_dbar: f64) -> ProfileAction {
    if pressure_dbar < table.shallowest() {
        return ProfileAction::Continuous;
    }
    match table.next_point() {
        Some(next) if pressure_dbar <= next => ProfileAction::Single,
        _ => ProfileAction::Delay,
    }
}

/// Counts consecutive readings at the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacingDetector {
    threshold_dbar: f64,
    required: u32,
    count: u32,
}

impl Default for SurfacingDetector {
    fn default() -> Self {
        Self::new(PRES_AT_SURFACE + SURFACE_MARGIN, SURFACE_CHECKS)
    }
}

impl SurfacingDetector {
    pub fn new(threshold_dbar: f64, required: u32) -> Self {
        Self {
            threshold_dbar,
            required: required.max(1),
            count: 0,
        }
    }

    /// Record a reading and report whether the float has surfaced
    pub fn update(&mut self, pressure_dbar: f64) -> bool {
        if pressure_dbar <= self.threshold_dbar {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = 0;
        }
        self.surfaced()
    }

    pub fn surfaced(&self) -> bool {
        self.count >= self.required
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Surfacing and breakpoint settings for a profile
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ProfileConfig {
    pub bands: ProfileBands,

    /// Pressure at or below which a reading counts as surfaced, dbar
    pub surface_threshold_dbar: f64,

    /// Consecutive surfaced readings that end the profile
    pub surface_checks: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            bands: ProfileBands::default(),
            surface_threshold_dbar: PRES_AT_SURFACE + SURFACE_MARGIN,
            surface_checks: SURFACE_CHECKS,
        }
    }
}

/// Breakpoint table and surfacing detector for one profile.
#[derive(Clone, Debug)]
pub struct ProfileScheduler {
    table: ProfileBreakpointTable,
    surfacing: SurfacingDetector,
    last_action: Option<ProfileAction>,
}

impl ProfileScheduler {
    pub fn new(cfg: &ProfileConfig) -> Self {
        Self {
            table: cfg.bands.build(),
            surfacing: SurfacingDetector::new(cfg.surface_threshold_dbar, cfg.surface_checks),
            last_action: None,
        }
    }

    pub fn table(&self) -> &ProfileBreakpointTable {
        &self.table
    }

    pub fn last_action(&self) -> Option<ProfileAction> {
        self.last_action
    }

    /// Action for a new pressure reading. Surfacing takes precedence over
    /// the breakpoint schedule.
    pub fn evaluate(&mut self, pressure_dbar: f64) -> ProfileAction {
        let action = if self.surfacing.update(pressure_dbar) {
            ProfileAction::Complete
        } else {
            measure_now(&mut self.table, pressure_dbar)
        };
        self.last_action = Some(action);
        action
    }
}
