//! Numbered status notifications, logged through `tracing` and optionally
//! forwarded to an outside listener.

use crossbeam::channel::{Sender, TrySendError};
use tracing::{debug, error, info, warn};

use hypernav_shared::Side;

/// Notification codes. Values are stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SyslogCode {
    AcquisitionStarted = 100,
    AcquisitionStopping = 101,
    AcquisitionStopped = 102,
    PhaseChanged = 110,
    IntegrationChanged = 111,
    SideDisabled = 112,

    ProfileStarted = 120,
    ProfileAction = 121,
    ProfileSurfaced = 122,
    OffloadComplete = 123,

    SamplingStartFailed = 200,
    ShutterFailed = 201,
    PowerFailed = 202,
    PressureReadFailed = 210,
    AttitudeReadFailed = 211,
    TemperatureReadFailed = 212,
    MisaddressedPacket = 220,
    InvalidCommand = 221,
    FrameDropped = 230,
    DispatchFailed = 231,
    FifoOverrun = 240,
    FlashWriteFailed = 250,
    FlashReadFailed = 251,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl SyslogCode {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn severity(&self) -> Severity {
        use SyslogCode::*;
        match self {
            PhaseChanged => Severity::Debug,
            AcquisitionStarted | AcquisitionStopping | AcquisitionStopped | IntegrationChanged
            | ProfileStarted | ProfileAction | ProfileSurfaced | OffloadComplete => Severity::Info,
            SideDisabled | PressureReadFailed | AttitudeReadFailed | TemperatureReadFailed
            | MisaddressedPacket | InvalidCommand | FrameDropped | DispatchFailed
            | FifoOverrun => Severity::Warning,
            SamplingStartFailed | ShutterFailed | PowerFailed | FlashWriteFailed
            | FlashReadFailed => Severity::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub code: SyslogCode,
    pub side: Option<Side>,
    pub message: String,
}

/// Emits notifications to the log and to an optional listener.
///
/// The listener channel is never waited on; a full channel drops the
/// notification after it has been logged.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
    tx: Option<Sender<Notification>>,
}

impl Notifier {
    pub fn new(tx: Option<Sender<Notification>>) -> Self {
        Self { tx }
    }

    pub fn set_listener(&mut self, tx: Sender<Notification>) {
        self.tx = Some(tx);
    }

    pub fn emit(&mut self, code: SyslogCode, side: Option<Side>, message: impl Into<String>) {
        let message = message.into();
        let side_label = side.map(|s| s.label()).unwrap_or("-");
        let c = code.code();
        match code.severity() {
            Severity::Debug => debug!(code = c, side = side_label, "{message}"),
            Severity::Info => info!(code = c, side = side_label, "{message}"),
            Severity::Warning => warn!(code = c, side = side_label, "{message}"),
            Severity::Error => error!(code = c, side = side_label, "{message}"),
        }

        if let Some(tx) = &self.tx {
            let n = Notification {
                code,
                side,
                message,
            };
            if let Err(TrySendError::Disconnected(_)) = tx.try_send(n) {
                self.tx = None;
            }
        }
    }
}
