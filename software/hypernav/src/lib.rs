#![doc = include_str!("../README.md")]

pub mod acquisition;
pub mod buffer_pool;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod flash;
pub mod frame;
pub mod hardware;
pub mod logging;
pub mod math;
pub mod notify;
pub mod profile;

pub use acquisition::{AcquisitionEngine, CommandLink, CommandPort, EngineThread, command_link};
pub use buffer_pool::{FrameHandle, FramePool, SlotStatus};
pub use config::DaqConfig;
pub use context::SessionCtx;
pub use dispatcher::{CsvDispatcher, FrameDispatcher, ProfileStore, StreamDispatcher};
pub use frame::AcquiredFrame;
pub use hardware::{Hardware, SimulatedBoard};
pub use notify::{Notification, SyslogCode};

pub use hypernav_shared;
