//! Command and response packets exchanged with the acquisition task.
//!
//! Every command occupies one fixed-size [`CommandPacket`]; fields that a
//! command does not use are left at zero.
use byte_struct::*;

use crate::acquisition::{AcquisitionMode, SpectrometerPhase};
use crate::wire_enum;

wire_enum!(
    /// Board that a packet is addressed to
    #[derive(Default)]
    pub enum BoardAddress {
        Controller = 1,
        #[default]
        Spectrometer = 2,
    }
);

wire_enum!(
    #[derive(Default)]
    #[non_exhaustive]
    pub enum CommandKind {
        Start = 1,
        Stop = 2,
        StartProfiling = 3,
        EndProfiling = 4,
        #[default]
        Query = 5,
    }
);

wire_enum!(
    /// Outcome of a command
    #[derive(Default)]
    #[non_exhaustive]
    pub enum ResponseStatus {
        #[default]
        Ack = 0b1111_1111,
        Nak = 0,
        NakBusy = 1,
        NakInvalidParameter = 2,
        NakMisaddressed = 3,
    }
);

/// Inbound command for the acquisition task.
#[derive(ByteStruct, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[byte_struct_le]
pub struct CommandPacket {
    /// Board the command is meant for
    pub destination: BoardAddress,

    pub kind: CommandKind,

    /// Requested mode for `Start`
    pub mode: AcquisitionMode,

    /// Fixed integration time for `Start`; zero selects automatic control
    pub fixed_integration_ms: u16,

    /// Lights per dark, or darks per ladder step when characterizing darks
    pub count: u16,
}

impl CommandPacket {
    pub fn start(mode: AcquisitionMode, fixed_integration_ms: Option<u16>, count: u16) -> Self {
        Self {
            kind: CommandKind::Start,
            mode,
            fixed_integration_ms: fixed_integration_ms.unwrap_or(0),
            count,
            ..Default::default()
        }
    }

    pub fn stop() -> Self {
        Self {
            kind: CommandKind::Stop,
            ..Default::default()
        }
    }

    pub fn start_profiling(lights_per_dark: u16) -> Self {
        Self {
            kind: CommandKind::StartProfiling,
            count: lights_per_dark,
            ..Default::default()
        }
    }

    pub fn end_profiling() -> Self {
        Self {
            kind: CommandKind::EndProfiling,
            ..Default::default()
        }
    }

    pub fn query() -> Self {
        Self {
            kind: CommandKind::Query,
            ..Default::default()
        }
    }

    /// Fixed integration time, if one was commanded
    pub fn fixed_integration(&self) -> Option<u16> {
        match self.fixed_integration_ms {
            0 => None,
            ms => Some(ms),
        }
    }
}

/// Reply to every command. Query fields are filled for all replies.
#[derive(ByteStruct, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[byte_struct_le]
pub struct ResponsePacket {
    pub status: ResponseStatus,
    pub mode: AcquisitionMode,

    /// Phase of the port spectrometer
    pub phase: SpectrometerPhase,

    pub reserved0: u8,
    pub reserved1: u8,
}
