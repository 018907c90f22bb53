//! Transition policy for the per-side phase machine.
//!
//! These functions only decide where a side goes next; the engine performs
//! the hardware actions for the phase it lands in.

use hypernav_shared::{AcquisitionMode, SpectrometerPhase};

use SpectrometerPhase::*;

/// Everything a transfer phase needs to choose the next phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStatus {
    /// A stop was requested or the profile measurement is done
    pub stop_requested: bool,

    /// Light readouts taken against the current dark, including this one
    pub lights_since_dark: u16,

    /// Light readouts per dark readout
    pub lights_per_dark: u16,

    /// The integration controller staged a different exposure
    pub change_staged: bool,

    /// A dark characterization sweep has finished its last ladder step
    pub sweep_complete: bool,

    /// Dark readouts taken at the current exposure, including this one
    pub darks_at_step: u16,

    /// Dark readouts per ladder step when characterizing darks
    pub darks_per_step: u16,
}

/// Phase after a dark readout
pub fn after_dark(mode: AcquisitionMode) -> SpectrometerPhase {
    if mode.sends_dark_frames() {
        TransferD
    } else {
        OpenShutter
    }
}

/// Phase after a light readout
pub fn after_light(mode: AcquisitionMode) -> SpectrometerPhase {
    if mode.differences_light() {
        TransferLmd
    } else {
        TransferL
    }
}

/// Phase after a frame has been handed off.
pub fn after_transfer(
    mode: AcquisitionMode,
    transfer: SpectrometerPhase,
    status: &CycleStatus,
) -> SpectrometerPhase {
    if status.stop_requested {
        return Idle;
    }

    match transfer {
        TransferD if mode.is_dark_only() => {
            if status.sweep_complete {
                Idle
            } else if status.darks_at_step >= status.darks_per_step.max(1) || status.change_staged
            {
                CloseShutter
            } else {
                StartDark
            }
        }
        TransferD => OpenShutter,
        TransferL | TransferLmd => {
            if status.change_staged || status.lights_since_dark >= status.lights_per_dark.max(1) {
                CloseShutter
            } else {
                StartLight
            }
        }
        _ => Idle,
    }
}

/// Phases reachable in one step from `phase`, including itself for the
/// phases that wait on hardware.
pub fn successors(phase: SpectrometerPhase) -> &'static [SpectrometerPhase] {
    match phase {
        Idle => &[Idle, CloseShutter],
        CloseShutter => &[StartDark, Idle],
        StartDark => &[GetDark, Idle],
        GetDark => &[GetDark, TransferD, OpenShutter, Idle],
        TransferD => &[CloseShutter, StartDark, OpenShutter, Idle],
        OpenShutter => &[StartLight, Idle],
        StartLight => &[GetLight, Idle],
        GetLight => &[GetLight, TransferL, TransferLmd, Idle],
        TransferL | TransferLmd => &[CloseShutter, StartLight, Idle],
        _ => &[Idle],
    }
}

/// Whether `from -> to` is a transition the engine may make
pub fn is_allowed(from: SpectrometerPhase, to: SpectrometerPhase) -> bool {
    from == to || successors(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(lights: u16, per_dark: u16) -> CycleStatus {
        CycleStatus {
            lights_since_dark: lights,
            lights_per_dark: per_dark,
            ..Default::default()
        }
    }

    #[test]
    fn dark_destination_by_mode() {
        use AcquisitionMode::*;
        for mode in [StreamLandD, Calibrate, DarkCharacterize] {
            assert_eq!(after_dark(mode), TransferD);
        }
        for mode in [StreamLmd, FloatProfile] {
            assert_eq!(after_dark(mode), OpenShutter);
        }
        assert_eq!(after_light(StreamLmd), TransferLmd);
        assert_eq!(after_light(FloatProfile), TransferLmd);
        assert_eq!(after_light(StreamLandD), TransferL);
        assert_eq!(after_light(Calibrate), TransferL);
    }

    #[test]
    fn lights_per_dark_governs_new_dark() {
        let mode = AcquisitionMode::StreamLmd;
        for n in 1..5 {
            assert_eq!(after_transfer(mode, TransferLmd, &status(n, 5)), StartLight);
        }
        assert_eq!(after_transfer(mode, TransferLmd, &status(5, 5)), CloseShutter);
    }

    #[test]
    fn staged_change_forces_new_dark() {
        let s = CycleStatus {
            change_staged: true,
            ..status(1, 5)
        };
        assert_eq!(
            after_transfer(AcquisitionMode::StreamLmd, TransferLmd, &s),
            CloseShutter
        );
    }

    #[test]
    fn stop_finishes_at_transfer() {
        let s = CycleStatus {
            stop_requested: true,
            ..status(1, 5)
        };
        for t in [TransferD, TransferL, TransferLmd] {
            assert_eq!(after_transfer(AcquisitionMode::StreamLandD, t, &s), Idle);
        }
    }

    #[test]
    fn dark_sweep_steps_and_finishes() {
        let mode = AcquisitionMode::DarkCharacterize;
        let mut s = CycleStatus {
            darks_at_step: 1,
            darks_per_step: 3,
            ..Default::default()
        };
        assert_eq!(after_transfer(mode, TransferD, &s), StartDark);
        s.darks_at_step = 3;
        assert_eq!(after_transfer(mode, TransferD, &s), CloseShutter);
        s.sweep_complete = true;
        assert_eq!(after_transfer(mode, TransferD, &s), Idle);
    }

    #[test]
    fn policy_outputs_are_allowed_transitions() {
        use AcquisitionMode::*;
        for mode in [StreamLmd, StreamLandD, Calibrate, DarkCharacterize, FloatProfile] {
            assert!(is_allowed(GetDark, after_dark(mode)));
            assert!(is_allowed(GetLight, after_light(mode)));
            for t in [TransferD, TransferL, TransferLmd] {
                for lights in 0..3 {
                    let s = status(lights, 2);
                    assert!(is_allowed(t, after_transfer(mode, t, &s)), "{mode:?} {t:?}");
                }
            }
        }
    }
}
