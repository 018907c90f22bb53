//! Acquisition modes, spectrometer phases, and the tags that identify
//! which spectrometer and which kind of spectrum a frame carries.

use crate::wire_enum;

wire_enum!(
    /// High-level acquisition behavior.
    ///
    /// The values 0 through 3 are also the mode codes accepted by the
    /// `Start` command.
    #[derive(Default)]
    #[non_exhaustive]
    pub enum AcquisitionMode {
        /// Stream light-minus-dark frames
        StreamLmd = 0,
        /// Stream separate light and dark frames
        StreamLandD = 1,
        /// Separate light and dark frames at a held integration time
        Calibrate = 2,
        /// Step through the integration ladder collecting darks only
        DarkCharacterize = 3,
        /// Depth-scheduled light-minus-dark frames stored to flash
        FloatProfile = 4,
        #[default]
        Idle = 0b1111_1111,
    }
);

impl AcquisitionMode {
    /// Whether this mode emits dark frames on their own
    /// rather than only as the baseline of a light-minus-dark frame.
    pub fn sends_dark_frames(&self) -> bool {
        matches!(
            self,
            Self::StreamLandD | Self::Calibrate | Self::DarkCharacterize
        )
    }

    /// Whether this mode differences each light frame against its dark.
    pub fn differences_light(&self) -> bool {
        matches!(self, Self::StreamLmd | Self::FloatProfile)
    }

    /// Whether this mode never opens the shutter.
    pub fn is_dark_only(&self) -> bool {
        matches!(self, Self::DarkCharacterize)
    }

    /// Modes that may be requested through `Start`
    pub fn is_startable(&self) -> bool {
        matches!(
            self,
            Self::StreamLmd | Self::StreamLandD | Self::Calibrate | Self::DarkCharacterize
        )
    }
}

wire_enum!(
    /// Position of one spectrometer within its dark/light cycle.
    #[derive(Default)]
    #[non_exhaustive]
    pub enum SpectrometerPhase {
        #[default]
        Idle = 0,
        CloseShutter = 1,
        StartDark = 2,
        GetDark = 3,
        TransferD = 4,
        OpenShutter = 5,
        StartLight = 6,
        GetLight = 7,
        TransferL = 8,
        TransferLmd = 9,
    }
);

impl SpectrometerPhase {
    /// Phases that hand a completed spectrum to frame assembly
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::TransferD | Self::TransferL | Self::TransferLmd)
    }
}

wire_enum!(
    /// Which spectrometer a reading belongs to.
    #[derive(Default)]
    pub enum Side {
        #[default]
        Port = 0,
        Starboard = 1,
    }
);

impl Side {
    pub const ALL: [Side; 2] = [Side::Port, Side::Starboard];

    /// Index into per-side arrays
    pub fn index(&self) -> usize {
        match self {
            Side::Port => 0,
            Side::Starboard => 1,
            Side::Unknown(x) => *x as usize,
        }
    }

    /// Single-letter label used in logs and file names
    pub fn label(&self) -> &'static str {
        match self {
            Side::Port => "A",
            Side::Starboard => "B",
            Side::Unknown(_) => "?",
        }
    }
}

wire_enum!(
    /// Transform applied to the pixel payload of a frame.
    #[derive(Default)]
    pub enum DataKind {
        #[default]
        Dark = 0,
        Light = 1,
        LightMinusDark = 2,
    }
);
