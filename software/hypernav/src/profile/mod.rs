//! Depth-triggered measurement scheduling for float profiles.

mod ascent;
mod breakpoints;
mod scheduler;

pub use ascent::{SURFACE_DBAR, SimulatedAscent};
pub use breakpoints::{DEFAULT_CAPACITY, GUARD_ENTRIES, ProfileBands, ProfileBreakpointTable};
pub use scheduler::{
    PRES_AT_SURFACE, ProfileAction, ProfileConfig, ProfileScheduler, SURFACE_CHECKS,
    SURFACE_MARGIN, SurfacingDetector, classify, measure_now,
};
