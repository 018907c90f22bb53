//! Engine fixtures over the simulated board.

#![allow(dead_code)]

use crossbeam::channel::{Receiver, unbounded};

use hypernav::acquisition::{AcquisitionEngine, CommandLink, command_link};
use hypernav::dispatcher::StreamDispatcher;
use hypernav::flash::RamFlash;
use hypernav::frame::AcquiredFrame;
use hypernav::hardware::{PressureSource, SimulatedBoard};
use hypernav::notify::Notification;
use hypernav::{DaqConfig, FrameHandle};

pub struct Bench {
    pub engine: AcquisitionEngine,
    pub link: CommandLink,
    pub board: SimulatedBoard,
    pub frames: Receiver<FrameHandle>,
    pub notes: Receiver<Notification>,
    pub flash: RamFlash,
}

impl Bench {
    pub fn new(cfg: DaqConfig, pressure: PressureSource) -> Self {
        let board = SimulatedBoard::new(cfg.pixel_count);
        Self::with_board(cfg, board, pressure)
    }

    /// For pressure sources that read from the same board
    pub fn with_board(cfg: DaqConfig, board: SimulatedBoard, pressure: PressureSource) -> Self {
        let (link, port) = command_link(8);
        let flash = RamFlash::new(4096, 64);
        let hw = board.hardware_with_pressure(pressure);

        let mut engine =
            AcquisitionEngine::new(cfg.clone(), hw, Box::new(flash.clone()), port).unwrap();
        let stream = StreamDispatcher::new(64);
        let frames = stream.receiver();
        engine.add_dispatcher(Box::new(stream));

        let (tx, notes) = unbounded();
        engine.set_notifications(tx);

        Self {
            engine,
            link,
            board,
            frames,
            notes,
            flash,
        }
    }

    /// Tick `n` times, copying streamed frames out so their slots are released
    pub fn run(&mut self, n: usize, out: &mut Vec<AcquiredFrame>) {
        for _ in 0..n {
            self.engine.tick();
            out.extend(self.frames.try_iter().map(|h| h.frame().clone()));
        }
    }
}

/// One enabled side with a small detector
pub fn one_side() -> DaqConfig {
    DaqConfig {
        serial_numbers: [1, 0],
        pixel_count: 64,
        ..Default::default()
    }
}

pub fn both_sides() -> DaqConfig {
    DaqConfig {
        serial_numbers: [1, 2],
        pixel_count: 64,
        ..Default::default()
    }
}
