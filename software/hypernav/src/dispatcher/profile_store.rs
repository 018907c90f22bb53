use crossbeam::channel::Sender;
use tracing::{debug, info, warn};

use super::FrameDispatcher;
use crate::buffer_pool::FrameHandle;
use crate::context::SessionCtx;
use crate::flash::{FlashDevice, FlashStack};
use crate::frame::AcquiredFrame;

/// Keeps profile frames in flash while the float ascends and hands them
/// back newest-first once the profile is over.
#[derive(Debug)]
pub struct ProfileStore {
    stack: FlashStack,
    buf: Vec<u8>,
    stored: u64,
    failed: u64,
}

impl ProfileStore {
    pub fn new(device: Box<dyn FlashDevice>) -> Self {
        Self {
            stack: FlashStack::new(device),
            buf: Vec::new(),
            stored: 0,
            failed: 0,
        }
    }

    pub fn stack(&self) -> &FlashStack {
        &self.stack
    }

    pub fn frame_count(&self) -> usize {
        self.stack.frame_count()
    }

    /// Frames that could not be written this session
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Pop every stored frame, newest first, into `sink`.
    ///
    /// Stops at the first record that cannot be read or decoded, or when the
    /// sink is gone. Returns the number of frames delivered.
    pub fn offload(&mut self, sink: &Sender<AcquiredFrame>) -> Result<usize, String> {
        let mut delivered = 0;
        while let Some(record) = self.stack.retrieve_frame()? {
            let frame = AcquiredFrame::from_bytes(&record)?;
            sink.send(frame)
                .map_err(|_| format!("Offload receiver closed after {delivered} frames"))?;
            delivered += 1;
        }
        info!("Offloaded {delivered} profile frames");
        Ok(delivered)
    }
}

impl FrameDispatcher for ProfileStore {
    fn init(&mut self, ctx: &SessionCtx) -> Result<(), String> {
        self.stored = 0;
        self.failed = 0;
        self.stack
            .init()
            .map_err(|e| format!("Failed to prepare flash for {}: {e}", ctx.op_name))?;
        debug!(
            "Profile store ready: {} bytes of flash",
            self.stack.capacity()
        );
        Ok(())
    }

    fn consume(&mut self, frame: FrameHandle) -> Result<(), String> {
        frame.frame().write_bytes(&mut self.buf);
        match self.stack.add_frame(&self.buf) {
            Ok(()) => {
                frame.mark_external();
                self.stored += 1;
                Ok(())
            }
            Err(e) => {
                self.failed += 1;
                Err(format!("Failed to store profile frame: {e}"))
            }
        }
    }

    fn terminate(&mut self) -> Result<(), String> {
        if self.failed > 0 {
            warn!(
                "Profile store kept {} frames and lost {}",
                self.stored, self.failed
            );
        } else {
            info!("Profile store kept {} frames", self.stored);
        }
        Ok(())
    }
}
