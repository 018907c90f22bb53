use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, info};

use super::FrameDispatcher;
use crate::buffer_pool::FrameHandle;
use crate::context::SessionCtx;

/// Hands frames to a consumer thread through a bounded queue.
///
/// The consumer receives [`FrameHandle`]s and releases each slot by dropping
/// it. When the consumer falls `depth` frames behind, new frames are dropped.
#[derive(Debug)]
pub struct StreamDispatcher {
    tx: Sender<FrameHandle>,
    rx: Receiver<FrameHandle>,
    sent: u64,
    dropped: u64,
}

impl StreamDispatcher {
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = bounded(depth.max(1));
        Self {
            tx,
            rx,
            sent: 0,
            dropped: 0,
        }
    }

    /// Consumer end of the queue
    pub fn receiver(&self) -> Receiver<FrameHandle> {
        self.rx.clone()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl FrameDispatcher for StreamDispatcher {
    fn init(&mut self, ctx: &SessionCtx) -> Result<(), String> {
        // Anything left from the last session goes back to the pool
        while self.rx.try_recv().is_ok() {}
        self.sent = 0;
        self.dropped = 0;
        debug!("Stream dispatcher ready for {}", ctx.op_name);
        Ok(())
    }

    fn consume(&mut self, frame: FrameHandle) -> Result<(), String> {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Err("Stream consumer is behind; frame dropped".to_string())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err("Stream consumer is gone; frame dropped".to_string())
            }
        }
    }

    fn terminate(&mut self) -> Result<(), String> {
        info!(
            "Stream dispatcher sent {} frames, dropped {}",
            self.sent, self.dropped
        );
        Ok(())
    }
}
