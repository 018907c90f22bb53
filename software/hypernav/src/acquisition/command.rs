//! Fixed-format command queue between a command source and the acquisition task.

use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, TryRecvError, bounded};

use hypernav_shared::{ByteStruct, ByteStructLen, CommandPacket, ResponsePacket};

type CommandBytes = [u8; CommandPacket::BYTE_LEN];
type ResponseBytes = [u8; ResponsePacket::BYTE_LEN];

/// Create a connected pair with room for `depth` queued commands
pub fn command_link(depth: usize) -> (CommandLink, CommandPort) {
    let (cmd_tx, cmd_rx) = bounded(depth.max(1));
    let (resp_tx, resp_rx) = bounded(depth.max(1));
    (
        CommandLink {
            commands: cmd_tx,
            responses: resp_rx,
        },
        CommandPort {
            commands: cmd_rx,
            responses: resp_tx,
        },
    )
}

/// Sending end, held by whatever issues commands
#[derive(Clone, Debug)]
pub struct CommandLink {
    commands: Sender<CommandBytes>,
    responses: Receiver<ResponseBytes>,
}

impl CommandLink {
    /// Queue a command without waiting for its response
    pub fn send(&self, cmd: &CommandPacket) -> Result<(), String> {
        let mut buf = [0_u8; CommandPacket::BYTE_LEN];
        cmd.write_bytes(&mut buf);
        self.send_bytes(buf)
    }

    /// Queue an already-encoded command
    pub fn send_bytes(&self, buf: CommandBytes) -> Result<(), String> {
        self.commands
            .try_send(buf)
            .map_err(|e| format!("Failed to queue command: {e}"))
    }

    pub fn try_response(&self) -> Option<ResponsePacket> {
        self.responses
            .try_recv()
            .ok()
            .map(|b| ResponsePacket::read_bytes(&b))
    }

    /// Queue a command and wait for the next response
    pub fn request(&self, cmd: &CommandPacket, timeout: Duration) -> Result<ResponsePacket, String> {
        self.send(cmd)?;
        self.responses
            .recv_timeout(timeout)
            .map(|b| ResponsePacket::read_bytes(&b))
            .map_err(|e| format!("No response to {:?}: {e}", cmd.kind))
    }
}

/// Receiving end, polled by the acquisition task
#[derive(Debug)]
pub struct CommandPort {
    commands: Receiver<CommandBytes>,
    responses: Sender<ResponseBytes>,
}

impl CommandPort {
    /// Next queued command, if any. Never blocks.
    pub fn try_next(&self) -> Option<CommandPacket> {
        match self.commands.try_recv() {
            Ok(b) => Some(CommandPacket::read_bytes(&b)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Send a response. Returns an error if nobody is listening or the
    /// response queue is full.
    pub fn respond(&self, resp: &ResponsePacket) -> Result<(), String> {
        let mut buf = [0_u8; ResponsePacket::BYTE_LEN];
        resp.write_bytes(&mut buf);
        self.responses
            .try_send(buf)
            .map_err(|e| format!("Failed to send response: {e}"))
    }
}
